use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StillreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        StillreelError::path_resolution("x")
            .to_string()
            .contains("path resolution error:")
    );
    assert!(
        StillreelError::unsupported("x")
            .to_string()
            .contains("unsupported settings:")
    );
    assert!(
        StillreelError::buffer_allocation("x")
            .to_string()
            .contains("buffer allocation error:")
    );
    assert!(StillreelError::decode("x").to_string().contains("decode error:"));
    assert!(
        StillreelError::encoder("x")
            .to_string()
            .contains("encoder error:")
    );
}

#[test]
fn output_exists_names_the_path() {
    let err = StillreelError::OutputExists(PathBuf::from("/tmp/out.mp4"));
    assert_eq!(err.to_string(), "output file '/tmp/out.mp4' already exists");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StillreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
