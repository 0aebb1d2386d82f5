use std::hash::Hasher;

use fnv::FnvHasher;

/// Hash FNV-1a de la clave, recortado a 31 bits (no negativo).
///
/// Tiene que dar lo mismo en todos los procesos: el worker que hace el map y
/// el que hace el reduce deben coincidir en el bucket de cada clave.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Bucket reduce de `key` para un job con `n_reduce` buckets.
pub fn partition(key: &str, n_reduce: usize) -> usize {
    ihash(key) as usize % n_reduce.max(1)
}
