/// Substitute an empty mapping for an absent one.
///
/// Works for any container with an empty `Default`: `HashMap`,
/// `BTreeMap`, `serde_json::Map`, and so on.
pub fn or_else_empty<M: Default>(data: Option<M>) -> M {
    data.unwrap_or_default()
}
