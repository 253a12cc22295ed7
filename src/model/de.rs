use serde::{Deserialize, Deserializer};

/// Deserialize a field that may be `null` into its default value.
///
/// Editor output uses `null` and a missing key interchangeably for
/// `attrs` and `marks`.
pub(crate) fn deserialize_or_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    let opt = Option::<T>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
