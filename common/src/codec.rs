use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::KeyValue;

/// Formato de los registros dentro de un archivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEncoding {
    /// Un objeto JSON `{"key":..,"value":..}` por línea (intermedios)
    JsonLines,
    /// Una línea `clave valor` por registro (salida final)
    Text,
}

/// Escribe `records` en `writer` con el formato indicado.
pub fn encode_records<W: Write>(
    writer: &mut W,
    records: &[KeyValue],
    encoding: RecordEncoding,
) -> io::Result<()> {
    for kv in records {
        match encoding {
            RecordEncoding::JsonLines => {
                serde_json::to_writer(&mut *writer, kv)?;
                writer.write_all(b"\n")?;
            }
            RecordEncoding::Text => writeln!(writer, "{} {}", kv.key, kv.value)?,
        }
    }
    Ok(())
}

/// Lee registros JSONL hasta el final o hasta el primer registro inválido.
///
/// Un registro corrupto corta la lectura del archivo: lo leído hasta ahí se
/// conserva.
pub fn decode_json_records<R: BufRead>(reader: R, origin: &str) -> Vec<KeyValue> {
    let mut out = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("error leyendo {} (línea {}): {}", origin, lineno + 1, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<KeyValue>(&line) {
            Ok(kv) => out.push(kv),
            Err(e) => {
                warn!(
                    "registro inválido en {} (línea {}): {}; se descarta el resto",
                    origin,
                    lineno + 1,
                    e
                );
                break;
            }
        }
    }
    out
}
