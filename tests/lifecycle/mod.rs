mod process_boundary;
mod timeouts;
