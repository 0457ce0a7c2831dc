// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types

use std::fmt;

use crate::hash::NameHash;
use crate::manifest::AssetType;

/// Two distinct paths that produce the same name hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCollision {
    pub name_hash: NameHash,
    /// Path already registered under the hash
    pub existing_path: String,
    /// Path that was about to be registered
    pub incoming_path: String,
}

impl fmt::Display for HashCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' and '{}' both hash to {}",
            self.existing_path, self.incoming_path, self.name_hash
        )
    }
}

/// Streaming error type
#[derive(Debug, Clone)]
pub enum StreamError {
    /// Name hash is not present in the manifest
    UnknownNameHash(NameHash),

    /// Requested asset type does not match the manifest entry
    AssetTypeMismatch {
        name_hash: NameHash,
        expected: AssetType,
        found: AssetType,
    },

    /// No fallback installed for the type (before startup or after shutdown)
    NoMissingAsset(AssetType),

    /// Manifest mutation attempted outside editor mode
    EditorOnly(&'static str),

    /// Registering an entry would alias another path
    HashCollision(HashCollision),

    /// File extension does not map to any asset type
    UnsupportedAsset(String),

    /// Storage backend failure
    Io(String),

    /// Payload could not be decoded
    Decode(String),

    /// Manifest could not be read or written
    Manifest(String),

    /// Invalid configuration
    Config(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::UnknownNameHash(hash) => {
                write!(f, "Name hash {hash} is not in the manifest")
            }
            StreamError::AssetTypeMismatch {
                name_hash,
                expected,
                found,
            } => write!(
                f,
                "Asset {name_hash} is a {found} but was requested as a {expected}"
            ),
            StreamError::NoMissingAsset(asset_type) => {
                write!(f, "No missing {asset_type} asset is installed")
            }
            StreamError::EditorOnly(operation) => {
                write!(f, "'{operation}' is only available in editor mode")
            }
            StreamError::HashCollision(collision) => write!(f, "Hash collision: {collision}"),
            StreamError::UnsupportedAsset(path) => write!(f, "Unsupported asset: {path}"),
            StreamError::Io(msg) => write!(f, "IO error: {msg}"),
            StreamError::Decode(msg) => write!(f, "Decode error: {msg}"),
            StreamError::Manifest(msg) => write!(f, "Manifest error: {msg}"),
            StreamError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io(err.to_string())
    }
}

impl From<HashCollision> for StreamError {
    fn from(collision: HashCollision) -> Self {
        StreamError::HashCollision(collision)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StreamError>;
