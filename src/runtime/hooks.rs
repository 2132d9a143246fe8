/// Outcome of an awaited phase raced against the global deadline.
pub(crate) enum HookDecision<T> {
    Finished(T),
    Expired,
}
