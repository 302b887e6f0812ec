//! Model identifier mapping.

/// Map a batch model id (`v4.5`, `v5`, ...) to the Suno API model name.
///
/// Known aliases map to `V5`, `V4_5`, `V4` and `V3_5`; anything else is
/// uppercased with dots replaced by underscores.
///
/// ```
/// use songbatch_suno::models::map_model;
///
/// assert_eq!(map_model("v4.5"), "V4_5");
/// assert_eq!(map_model("v4.5plus"), "V4_5");
/// assert_eq!(map_model("chirp-v3-5"), "V3_5");
/// assert_eq!(map_model("v6.1"), "V6_1");
/// ```
pub fn map_model(model: &str) -> String {
    let normalized = model.trim().to_ascii_lowercase();
    let mapped = match normalized.as_str() {
        "v5" | "v5.0" | "v5_0" => "V5",
        "v4.5" | "v4_5" | "v4.5plus" | "v4_5plus" => "V4_5",
        "v4" | "v4.0" | "v4_0" => "V4",
        "v3.5" | "v3_5" | "chirp-v3-5" => "V3_5",
        _ => return model.trim().to_ascii_uppercase().replace('.', "_"),
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_case_insensitive() {
        assert_eq!(map_model(" V5 "), "V5");
        assert_eq!(map_model("V4_0"), "V4");
        assert_eq!(map_model("v3.5"), "V3_5");
    }

    #[test]
    fn unknown_models_are_upper_snake() {
        assert_eq!(map_model("v4.5-beta"), "V4_5-BETA");
    }
}
