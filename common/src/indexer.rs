use std::collections::BTreeSet;

use crate::wordcount::tokenize;
use crate::KeyValue;

/// Map del índice invertido: (palabra, documento) una vez por palabra distinta.
pub fn map(source: &str, contents: &str) -> Vec<KeyValue> {
    let words: BTreeSet<String> = tokenize(contents).collect();
    words
        .into_iter()
        .map(|w| KeyValue::new(w, source))
        .collect()
}

/// Reduce del índice invertido: "<n> doc1,doc2,..." con documentos ordenados
/// y sin repetir.
pub fn reduce(_key: &str, values: &[String]) -> String {
    let docs: BTreeSet<&str> = values.iter().map(String::as_str).collect();
    let list: Vec<&str> = docs.into_iter().collect();
    format!("{} {}", list.len(), list.join(","))
}
