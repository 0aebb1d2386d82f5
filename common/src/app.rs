use anyhow::{bail, Result};

use crate::{indexer, wordcount, KeyValue};

/// Función map: (nombre del archivo, contenido) -> pares intermedios.
pub type MapFn = fn(&str, &str) -> Vec<KeyValue>;
/// Función reduce: (clave, todos sus valores) -> valor final.
pub type ReduceFn = fn(&str, &[String]) -> String;

/// Una aplicación MapReduce: el par de funciones que ejecutan los workers.
#[derive(Debug, Clone, Copy)]
pub struct Application {
    pub name: &'static str,
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

const BUILTIN: &[Application] = &[
    Application {
        name: "wc",
        map_fn: wordcount::map,
        reduce_fn: wordcount::reduce,
    },
    Application {
        name: "indexer",
        map_fn: indexer::map,
        reduce_fn: indexer::reduce,
    },
];

/// Nombres de las aplicaciones incluidas.
pub fn names() -> Vec<&'static str> {
    BUILTIN.iter().map(|a| a.name).collect()
}

pub fn try_named(name: &str) -> Option<Application> {
    BUILTIN.iter().copied().find(|a| a.name == name)
}

pub fn named(name: &str) -> Result<Application> {
    match try_named(name) {
        Some(app) => Ok(app),
        None => bail!(
            "aplicación desconocida '{}' (disponibles: {})",
            name,
            names().join(", ")
        ),
    }
}
