/// Integration tests for image storage

use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use recipe_shared::media::{MediaError, MediaStore, RECIPE_UPLOAD_DIR};
use std::io::Cursor;
use tempfile::TempDir;

fn png_bytes() -> Bytes {
    let img = RgbImage::from_pixel(10, 10, Rgb([200, 80, 20]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

fn files_in_upload_dir(root: &std::path::Path) -> usize {
    std::fs::read_dir(root.join(RECIPE_UPLOAD_DIR))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_save_valid_image() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path(), "/media");

    let data = png_bytes();
    let relative = store
        .save_recipe_image(Some("example.png"), data.clone())
        .await
        .unwrap();

    assert!(relative.starts_with("uploads/recipe/"));
    assert!(relative.ends_with(".png"));

    let written = std::fs::read(store.path_for(&relative)).unwrap();
    assert_eq!(written, data.to_vec());
    assert_eq!(store.url_for(&relative), format!("/media/{}", relative));
}

#[tokio::test]
async fn test_extension_taken_from_detected_format_without_filename() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path(), "/media");

    let relative = store.save_recipe_image(None, png_bytes()).await.unwrap();
    assert!(relative.ends_with(".png"));
}

#[tokio::test]
async fn test_non_image_is_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path(), "/media");

    let result = store
        .save_recipe_image(Some("notimage.png"), Bytes::from_static(b"notimage"))
        .await;

    assert!(matches!(result, Err(MediaError::NotAnImage(_))));
    assert_eq!(files_in_upload_dir(dir.path()), 0);
}

#[tokio::test]
async fn test_truncated_image_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path(), "/media");

    let data = png_bytes();
    let truncated = data.slice(..data.len() / 2);

    let result = store.save_recipe_image(Some("broken.png"), truncated).await;

    assert!(matches!(result, Err(MediaError::NotAnImage(_))));
    assert_eq!(files_in_upload_dir(dir.path()), 0);
}

#[tokio::test]
async fn test_html_filename_stored_with_image_extension() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path(), "/media");

    let relative = store.save_recipe_image(Some("x.html"), png_bytes()).await.unwrap();

    assert!(relative.ends_with(".png"), "stored as {}", relative);
    assert!(!relative.contains("html"));
}

#[tokio::test]
async fn test_remove_deletes_file_and_tolerates_missing() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path(), "/media");

    let relative = store.save_recipe_image(None, png_bytes()).await.unwrap();
    assert!(store.path_for(&relative).exists());

    store.remove(&relative).await.unwrap();
    assert!(!store.path_for(&relative).exists());

    store.remove(&relative).await.unwrap();
}
