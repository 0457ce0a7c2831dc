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

//! Archetype Stream - Manifest-driven asset streaming
//!
//! Reference-counted, arena-backed asset cache with synchronous and
//! asynchronous loading, frame-paced finalization and garbage collection.

pub mod arena;
pub mod assets;
pub mod config;
pub mod debug;
pub mod decoder;
pub mod error;
pub mod handle;
pub mod hash;
pub mod manager;
pub mod manifest;
pub mod prelude;
pub mod render;
pub mod stats;
pub mod storage;
pub mod type_manager;
pub mod worker;

pub use arena::*;
pub use config::*;
pub use decoder::*;
pub use error::*;
pub use handle::*;
pub use hash::*;
pub use manager::*;
pub use manifest::*;
pub use render::*;
pub use stats::*;
pub use storage::*;
pub use type_manager::*;
pub use worker::*;
