//! Contexts, and which one is in use, are saved between calls of the tql command.
//!
//! Everything is stored as JSON under `$TQL_CACHE_DIR`, or `$HOME/.cache/toit-tql/cache/v1`.
use crate::context::{Context, ContextName};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Where a cached value lives, relative to the folder of its type.
pub trait CacheKey {
    fn as_path(&self) -> String;
}

/// Something we can save between runs.
///
/// Each cacheable type names the key type it's stored under, so `read::<Context, _>()` only
/// accepts a [ContextName]. Several cacheables may share a key type.
pub trait Cacheable {
    type CacheKey;

    fn cache_key(&self) -> Self::CacheKey;

    /// Name of the folder all values of this type go in. Has to be unique per type.
    fn type_id() -> &'static str;
}

pub fn read<D, K>(cache_key: &K) -> Result<D, crate::Error>
where
    D: Cacheable<CacheKey = K> + DeserializeOwned,
    K: CacheKey,
{
    let file_location = get_cache_path(D::type_id(), cache_key.as_path().as_str())?;
    debug!("reading {}", file_location.display());

    let data = serde_json::from_reader(fs::File::open(file_location)?)?;

    Ok(data)
}

/// Reads every cached instance of `D`, in no particular order.
pub fn read_all<D>() -> Result<Vec<D>, crate::Error>
where
    D: Cacheable + DeserializeOwned,
{
    let folder = require_cache_folder(D::type_id())?;
    let mut all = Vec::new();

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();

        if path.extension().and_then(|extension| extension.to_str()) != Some("json") {
            continue;
        }

        all.push(serde_json::from_reader(fs::File::open(path)?)?);
    }

    Ok(all)
}

pub fn write<D, K>(data: &D) -> Result<(), crate::Error>
where
    D: Cacheable<CacheKey = K> + Serialize,
    K: CacheKey,
{
    let file_location = get_cache_path(D::type_id(), data.cache_key().as_path().as_str())?;
    debug!("writing {}", file_location.display());

    let data = serde_json::to_string(&data)?;

    fs::write(file_location, data)?;

    Ok(())
}

fn get_cache_path(type_id: &'static str, cache_key: &str) -> Result<PathBuf, crate::Error> {
    let mut location = require_cache_folder(type_id)?;

    location.push(cache_key);

    Ok(location)
}

fn require_cache_folder(type_id: &'static str) -> Result<PathBuf, crate::Error> {
    let mut path = match std::env::var_os("TQL_CACHE_DIR") {
        Some(cache_dir) => PathBuf::from(cache_dir),
        None => {
            let mut path = PathBuf::from(std::env::var("HOME")?);
            path.push(".cache");
            path.push("toit-tql");
            path.push("cache");
            path.push("v1");

            path
        }
    };
    path.push(type_id);

    fs::create_dir_all(&path)?;

    Ok(path)
}

impl Cacheable for Context {
    type CacheKey = ContextName;

    fn cache_key(&self) -> Self::CacheKey {
        self.name.clone()
    }

    fn type_id() -> &'static str {
        "context"
    }
}

impl CacheKey for ContextName {
    fn as_path(&self) -> String {
        format!("context_{}.json", self)
    }
}

/// The current context is just its name, saved under a fixed key.
impl Cacheable for ContextName {
    type CacheKey = SharedCacheKey;

    fn cache_key(&self) -> Self::CacheKey {
        SharedCacheKey(Self::type_id().to_owned())
    }

    fn type_id() -> &'static str {
        "current_context"
    }
}

pub struct SharedCacheKey(String);

impl CacheKey for SharedCacheKey {
    fn as_path(&self) -> String {
        self.0.clone()
    }
}

impl SharedCacheKey {
    pub fn of<D: Cacheable<CacheKey = SharedCacheKey>>() -> Self {
        SharedCacheKey(D::type_id().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Dialect, RenderOptions};

    #[test]
    fn test_contexts_round_trip_through_the_cache() {
        let cache_dir = std::env::temp_dir().join(format!("toit-tql-cache-{}", std::process::id()));
        std::env::set_var("TQL_CACHE_DIR", &cache_dir);

        let context = Context {
            name: "staging".into(),
            tenant: Some("acme".to_string()),
            options: RenderOptions {
                dialect: Dialect::MariaDb,
                ..RenderOptions::default()
            },
        };

        write(&context).unwrap();
        write(&context.name).unwrap();

        let read_back: Context = read(&ContextName::from("staging")).unwrap();
        assert_eq!(context, read_back);
        assert_eq!(context.name, ContextName::current().unwrap());

        let all: Vec<Context> = read_all().unwrap();
        assert_eq!(vec![context], all);

        fs::remove_dir_all(cache_dir).unwrap();
    }
}
