use camino::Utf8PathBuf;
use tracing::info;

use crate::domain::CountryCode;
use crate::error::CollectorError;
use crate::series::TestsArtifact;
use crate::store::Store;

/// Replaces `<output>/<code>/tests-OWID.json` with `artifact`.
pub fn write_artifact(
    store: &Store,
    code: &CountryCode,
    artifact: &TestsArtifact,
) -> Result<Utf8PathBuf, CollectorError> {
    if code.as_str().is_empty() {
        return Err(CollectorError::InvalidPath(format!(
            "empty country code below {}",
            store.output_root()
        )));
    }
    store.ensure_country_dir(code)?;
    let path = store.artifact_path(code);
    Store::write_json_atomic(&path, artifact)?;
    info!(path = %path, days = artifact.data.len(), "wrote artifact");
    Ok(path)
}
