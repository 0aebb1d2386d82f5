use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::app::{MapFn, ReduceFn};
use crate::atomic::write_records_atomic;
use crate::codec::{decode_json_records, RecordEncoding};
use crate::partition::partition;
use crate::KeyValue;

pub const DEFAULT_INTERMEDIATE_PREFIX: &str = "mr";
pub const DEFAULT_OUTPUT_PREFIX: &str = "mr-out";

/// Dónde y con qué nombres se escriben intermedios y salidas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
    pub work_dir: PathBuf,
    pub intermediate_prefix: String,
    pub output_prefix: String,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            intermediate_prefix: DEFAULT_INTERMEDIATE_PREFIX.to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl FileLayout {
    pub fn in_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// `<prefijo>-<map>-<reduce>`; el separador evita que (1, 11) y (11, 1)
    /// choquen.
    pub fn intermediate_name(&self, map_index: usize, reduce_index: usize) -> String {
        format!("{}-{}-{}", self.intermediate_prefix, map_index, reduce_index)
    }

    pub fn intermediate_path(&self, map_index: usize, reduce_index: usize) -> PathBuf {
        self.work_dir
            .join(self.intermediate_name(map_index, reduce_index))
    }

    pub fn output_name(&self, reduce_index: usize) -> String {
        format!("{}-{}", self.output_prefix, reduce_index)
    }

    pub fn output_path(&self, reduce_index: usize) -> PathBuf {
        self.work_dir.join(self.output_name(reduce_index))
    }

    /// True si `file_name` tiene la forma `<output_prefix>-<n>`.
    pub fn is_output_name(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(&self.output_prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }
}

/// Resultado de ejecutar una tarea map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapOutcome {
    /// Un elemento por bucket: ruta del intermedio o "" si quedó vacío
    Completed { bucket_files: Vec<String> },
    /// No se pudo leer el archivo de entrada
    Unrunnable { reason: String },
}

/// Resultado de ejecutar una tarea reduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    Completed { output: PathBuf, keys: usize },
    /// Falta algún intermedio; no se reporta y el lease vence solo
    InputUnavailable { reason: String },
    /// No se pudo escribir la salida
    Unrunnable { reason: String },
}

/* =========================
   Map
   ========================= */

/// Ejecuta la tarea map `index` sobre `source`.
///
/// Aplica `map_fn`, ordena por clave, reparte en `n_reduce` buckets y escribe
/// cada bucket no vacío de forma atómica. Si el intermedio ya existe (otro
/// intento de la misma tarea lo dejó) se reutiliza sin reescribirlo. Un fallo
/// al escribir un bucket deja "" en su lugar y la tarea igual se completa.
pub fn execute_map(
    map_fn: MapFn,
    source: &str,
    index: usize,
    n_reduce: usize,
    layout: &FileLayout,
) -> MapOutcome {
    // bytes inválidos en UTF-8 se reemplazan: el archivo se puede leer igual
    let bytes = match fs::read(source) {
        Ok(b) => b,
        Err(e) => {
            return MapOutcome::Unrunnable {
                reason: format!("no se pudo leer {}: {}", source, e),
            }
        }
    };
    let contents = String::from_utf8_lossy(&bytes);

    let mut kvs = map_fn(source, &contents);
    kvs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); n_reduce];
    if n_reduce > 0 {
        for kv in kvs {
            let r = partition(&kv.key, n_reduce);
            buckets[r].push(kv);
        }
    }

    let mut bucket_files = Vec::with_capacity(n_reduce);
    for (r, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            bucket_files.push(String::new());
            continue;
        }

        let path = layout.intermediate_path(index, r);
        if path.exists() {
            debug!("intermedio {} ya existe, se reutiliza", path.display());
            bucket_files.push(path.to_string_lossy().to_string());
            continue;
        }

        match write_records_atomic(&path, bucket, RecordEncoding::JsonLines) {
            Ok(()) => bucket_files.push(path.to_string_lossy().to_string()),
            Err(e) => {
                warn!(
                    "no se pudo escribir el intermedio {}: {}; bucket vacío",
                    path.display(),
                    e
                );
                bucket_files.push(String::new());
            }
        }
    }

    info!(
        "map {} ({}) listo: {} buckets con datos",
        index,
        source,
        bucket_files.iter().filter(|f| !f.is_empty()).count()
    );
    MapOutcome::Completed { bucket_files }
}

/* =========================
   Reduce
   ========================= */

fn read_intermediate(path: &Path) -> io::Result<Vec<KeyValue>> {
    let file = File::open(path)?;
    Ok(decode_json_records(
        BufReader::new(file),
        &path.to_string_lossy(),
    ))
}

/// Ejecuta la tarea reduce `index` sobre sus intermedios.
///
/// Junta todos los valores de cada clave, llama a `reduce_fn` una vez por
/// clave y escribe `<output_prefix>-<index>` con una línea `clave valor` por
/// clave, ordenadas. Si algún intermedio no se puede abrir no se escribe
/// nada: la salida quedaría incompleta.
pub fn execute_reduce(
    reduce_fn: ReduceFn,
    inputs: &[String],
    index: usize,
    layout: &FileLayout,
) -> ReduceOutcome {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for input in inputs.iter().filter(|p| !p.is_empty()) {
        let records = match read_intermediate(Path::new(input)) {
            Ok(r) => r,
            Err(e) => {
                return ReduceOutcome::InputUnavailable {
                    reason: format!("no se pudo abrir el intermedio {}: {}", input, e),
                }
            }
        };
        for kv in records {
            grouped.entry(kv.key).or_default().push(kv.value);
        }
    }

    let results: Vec<KeyValue> = grouped
        .iter()
        .map(|(key, values)| KeyValue::new(key.clone(), reduce_fn(key, values)))
        .collect();

    let output = layout.output_path(index);
    match write_records_atomic(&output, &results, RecordEncoding::Text) {
        Ok(()) => {
            info!(
                "reduce {} listo: {} claves en {}",
                index,
                results.len(),
                output.display()
            );
            ReduceOutcome::Completed {
                output,
                keys: results.len(),
            }
        }
        Err(e) => ReduceOutcome::Unrunnable {
            reason: format!("no se pudo escribir {}: {}", output.display(), e),
        },
    }
}
