use crate::KeyValue;

/// Normaliza el texto en palabras: separa por espacios, deja solo
/// alfanuméricos y '_', pasa a minúscula y descarta lo que quede vacío.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().filter_map(|raw| {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    })
}

/// Map de WordCount: un ("palabra", "1") por ocurrencia.
pub fn map(_source: &str, contents: &str) -> Vec<KeyValue> {
    tokenize(contents).map(|w| KeyValue::new(w, "1")).collect()
}

/// Reduce de WordCount: cantidad de ocurrencias.
pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}
