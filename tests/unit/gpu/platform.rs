use super::*;

#[test]
fn surface_errors_map_to_distinct_reasons() {
    assert_eq!(
        PlatformError::BadAlloc.surface_failure(),
        SurfaceFailure::OutOfResources
    );
    assert_eq!(
        PlatformError::BadConfig.surface_failure(),
        SurfaceFailure::InvalidConfig
    );
    assert_eq!(
        PlatformError::BadParameter.surface_failure(),
        SurfaceFailure::InvalidDimensions
    );
    assert_eq!(
        PlatformError::BadMatch.surface_failure(),
        SurfaceFailure::WindowConfigMismatch
    );
    assert_eq!(
        PlatformError::BadNativeWindow.surface_failure(),
        SurfaceFailure::Other(0x300B)
    );
}

#[test]
fn codes_are_unique() {
    let all = [
        PlatformError::NotInitialized,
        PlatformError::BadAccess,
        PlatformError::BadAlloc,
        PlatformError::BadAttribute,
        PlatformError::BadConfig,
        PlatformError::BadContext,
        PlatformError::BadCurrentSurface,
        PlatformError::BadDisplay,
        PlatformError::BadMatch,
        PlatformError::BadNativeWindow,
        PlatformError::BadParameter,
        PlatformError::BadSurface,
        PlatformError::BadTexture,
        PlatformError::ContextLost,
    ];
    let mut codes: Vec<u32> = all.iter().map(|e| e.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), all.len());
}
