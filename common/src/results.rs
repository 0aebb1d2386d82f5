use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResults {
    /// Directorio donde quedaron los outputs
    pub output_dir: String,
    /// Nombres de archivos de salida dentro de output_dir, ordenados
    pub files: Vec<String>,
    /// false mientras el job siga corriendo (la lista puede estar incompleta)
    pub complete: bool,
}
