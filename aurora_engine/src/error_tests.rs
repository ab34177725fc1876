/// Unit tests for error.rs

use crate::error::{Error, Result};

#[test]
fn test_display_messages() {
    assert_eq!(
        Error::BackendError("boom".to_string()).to_string(),
        "Backend error: boom"
    );
    assert_eq!(Error::OutOfMemory.to_string(), "Out of GPU memory");
    assert_eq!(
        Error::InvalidResource("bad".to_string()).to_string(),
        "Invalid resource: bad"
    );
    assert_eq!(
        Error::InitializationFailed("no device".to_string()).to_string(),
        "Initialization failed: no device"
    );
    assert_eq!(
        Error::AssetError("missing.obj".to_string()).to_string(),
        "Asset error: missing.obj"
    );
}

#[test]
fn test_engine_err_macro_builds_backend_error() {
    let error = crate::engine_err!("aurora::Test", "count was {}", 3);
    match error {
        Error::BackendError(msg) => assert_eq!(msg, "count was 3"),
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[test]
fn test_engine_bail_macro_returns_early() {
    fn failing() -> Result<u32> {
        crate::engine_bail!("aurora::Test", "always fails");
    }
    assert!(failing().is_err());
}

#[test]
fn test_engine_asset_err_macro() {
    let error = crate::engine_asset_err!("aurora::Test", "cannot read '{}'", "a.obj");
    assert!(matches!(error, Error::AssetError(_)));
}
