use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::debug;
use uuid::Uuid;

use crate::codec::{encode_records, RecordEncoding};
use crate::KeyValue;

/// Permisos del archivo final.
pub const OUTPUT_FILE_MODE: u32 = 0o644;

/// Prefijo de los temporales; nunca coincide con un nombre de salida.
const TEMP_PREFIX: &str = ".tmp-";

/// Borra el temporal si no se llegó al rename.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Ruta del temporal: mismo directorio que el destino, nombre único.
fn temp_path_for(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("ruta sin nombre de archivo: {}", path.display()),
        )
    })?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(dir.join(format!(
        "{}{}-{}",
        TEMP_PREFIX,
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    )))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Escribe `records` en `path` de forma atómica.
///
/// Los lectores ven el archivo anterior completo o el nuevo completo, nunca
/// uno a medias: se escribe un temporal en el mismo directorio, se hace
/// fsync, se cierra, se ajustan permisos y recién ahí se renombra sobre el
/// destino. Si algo falla antes del rename el temporal se borra y el destino
/// queda intacto.
pub fn write_records_atomic(
    path: &Path,
    records: &[KeyValue],
    encoding: RecordEncoding,
) -> io::Result<()> {
    let tmp_path = temp_path_for(path)?;
    let guard = TempGuard {
        path: tmp_path.clone(),
        armed: true,
    };

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    encode_records(&mut writer, records, encoding)?;
    writer.flush()?;

    let file: File = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    set_mode(&tmp_path, OUTPUT_FILE_MODE)?;
    fs::rename(&tmp_path, path)?;
    guard.disarm();

    debug!("escrito {} ({} registros)", path.display(), records.len());
    Ok(())
}

/// Borra de `dir` los temporales con al menos `older_than` de antigüedad.
///
/// Un proceso que muere entre la creación del temporal y el rename lo deja
/// huérfano: el destino no se toca, pero el `.tmp-*` queda. Devuelve cuántos
/// se borraron.
pub fn sweep_stale_temp_files(dir: &Path, older_than: Duration) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        // mtime en el futuro cuenta como recién escrito
        let age = meta.modified()?.elapsed().unwrap_or(Duration::ZERO);
        if age < older_than {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            // otro proceso lo renombró o borró primero
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    if removed > 0 {
        debug!("{} temporales huérfanos borrados en {}", removed, dir.display());
    }
    Ok(removed)
}
