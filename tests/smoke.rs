//! Basic smoke test to verify the public API surface.

#[test]
fn crate_compiles() {
    let _ = std::any::type_name::<hqcheck::LicensingConfig>();
    let _ = std::any::type_name::<hqcheck::LicensingError>();
    let _ = std::any::type_name::<hqcheck::CachedVerdict>();
}
