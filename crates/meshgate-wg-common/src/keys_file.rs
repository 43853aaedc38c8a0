// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Private key hand-off to `wg set ... private-key <file>`.

use crate::keys::WgKeyPair;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// File name of the private key inside its directory.
pub const PRIVATE_KEY_FILENAME: &str = "private.key";

#[derive(Error, Debug)]
#[error("failed to write private key to {path}: {source}")]
pub struct KeyFileError {
	pub path: PathBuf,
	#[source]
	pub source: std::io::Error,
}

/// Writes the base64 private key to `<dir>/private.key` and returns the path.
///
/// `dir` must exist. The file is created fresh with mode 0600; an existing
/// file is an error rather than being overwritten.
#[instrument(skip(keys), fields(dir = %dir.display()))]
pub async fn write_private_key(dir: &Path, keys: &WgKeyPair) -> Result<PathBuf, KeyFileError> {
	let path = dir.join(PRIVATE_KEY_FILENAME);
	let encoded = keys.private_key().to_base64();

	let write = async {
		let mut options = tokio::fs::OpenOptions::new();
		options.write(true).create_new(true);
		#[cfg(unix)]
		options.mode(0o600);

		let mut file = options.open(&path).await?;
		file.write_all(encoded.expose().as_bytes()).await?;
		file.write_all(b"\n").await?;
		file.flush().await
	};

	write.await.map_err(|source| KeyFileError {
		path: path.clone(),
		source,
	})?;

	debug!(path = %path.display(), "wrote private key");
	Ok(path)
}
