use serde::Deserialize;

pub fn deserialize_non_zero<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: num_traits::Zero + serde::Deserialize<'de>,
{
    let value = T::deserialize(deserializer)?;
    if value.is_zero() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

pub fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}
