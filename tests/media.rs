use hushroom::{AppError, MediaStore};
use tempfile::TempDir;

#[tokio::test]
async fn disallowed_extensions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let media = MediaStore::new(dir.path()).unwrap();

    for name in ["malware.exe", "script.sh", "noextension", "archive.tar.xz"] {
        let err = media.admit(name, b"payload").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidMediaType), "{name} got through");
    }

    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "rejected uploads leave nothing on disk"
    );
}

#[tokio::test]
async fn extension_match_is_case_insensitive() {
    let dir = TempDir::new().unwrap();
    let media = MediaStore::new(dir.path()).unwrap();

    media.admit("photo.JPG", b"bytes").await.unwrap();
    media.admit("clip.Mp4", b"bytes").await.unwrap();
}

#[tokio::test]
async fn admitted_files_land_with_their_content() {
    let dir = TempDir::new().unwrap();
    let media = MediaStore::new(dir.path()).unwrap();

    let media_ref = media.admit("cat.jpg", b"not really a jpeg").await.unwrap();
    assert!(media_ref.0.ends_with("cat.jpg"));

    let stored = std::fs::read(dir.path().join(&media_ref.0)).unwrap();
    assert_eq!(stored, b"not really a jpeg");
}

#[tokio::test]
async fn identical_original_names_never_collide() {
    let dir = TempDir::new().unwrap();
    let media = MediaStore::new(dir.path()).unwrap();

    let first = media.admit("cat.jpg", b"first").await.unwrap();
    let second = media.admit("cat.jpg", b"second").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(std::fs::read(dir.path().join(&first.0)).unwrap(), b"first");
    assert_eq!(std::fs::read(dir.path().join(&second.0)).unwrap(), b"second");
}

#[tokio::test]
async fn cancelled_admit_cleans_up_its_temp_file() {
    let dir = TempDir::new().unwrap();
    let media = MediaStore::new(dir.path()).unwrap();

    // Big enough that the write spans several polls.
    let payload = vec![7u8; 4 * 1024 * 1024];

    let names = |suffix: &str| -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(suffix))
            .collect()
    };

    {
        let admit = media.admit("big.mp4", &payload);
        tokio::pin!(admit);
        // Drive it until the temp file shows up on disk, then drop it
        // mid-write, the way a disconnect drops an in-flight future.
        loop {
            if futures_util::poll!(admit.as_mut()).is_ready() {
                break;
            }
            if !names(".part").is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    // Give any write already handed to the blocking pool a moment to land.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(names(".part").is_empty(), "no partial file left behind");
}

#[tokio::test]
async fn path_components_are_stripped() {
    let dir = TempDir::new().unwrap();
    let media = MediaStore::new(dir.path()).unwrap();

    let media_ref = media.admit("../../escape.png", b"bytes").await.unwrap();
    assert!(!media_ref.0.contains('/'));
    assert!(!media_ref.0.contains(".."));
    assert!(dir.path().join(&media_ref.0).exists());
}
