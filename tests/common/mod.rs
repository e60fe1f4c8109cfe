#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgba, RgbaImage};

pub const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
pub const BLUE: Rgba<u8> = Rgba([20, 20, 220, 255]);

/// Left half red, right half blue.
pub fn split_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| if x < width / 2 { RED } else { BLUE })
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    split_image(width, height)
        .save(path)
        .expect("write png file");
}
