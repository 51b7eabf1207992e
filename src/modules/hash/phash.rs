use std::time::Duration;

use image::imageops::FilterType;
use once_cell::sync::Lazy;

use crate::log_warn;

const GRID: u32 = 16;
const CELLS: usize = (GRID * GRID) as usize;
const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(BROWSER_UA)
        .timeout(Duration::from_secs(15))
        .build()
        .expect("failed to build phash http client")
});

/// Download `image_url` and compute its 64-hex-character block-mean
/// perceptual hash. Never propagates an error: any failure along the way
/// (transport, decode) yields `None`.
pub async fn phash(image_url: &str) -> Option<String> {
    let bytes = match HTTP.get(image_url).send().await {
        Ok(resp) => match resp.bytes().await {
            Ok(b) => b,
            Err(e) => {
                log_warn!("phash: failed to read body for {}: {}", image_url, e);
                return None;
            }
        },
        Err(e) => {
            log_warn!("phash: fetch failed for {}: {}", image_url, e);
            return None;
        }
    };

    phash_bytes(&bytes)
}

/// Pure, synchronous hash computation over already-downloaded image bytes.
pub fn phash_bytes(bytes: &[u8]) -> Option<String> {
    let img = image::load_from_memory(bytes).ok()?;
    let small = img.resize_exact(GRID, GRID, FilterType::Triangle).to_luma8();

    let cells: Vec<f64> = small.pixels().map(|p| p.0[0] as f64).collect();
    if cells.len() != CELLS {
        return None;
    }

    let mean: f64 = cells.iter().sum::<f64>() / CELLS as f64;

    let mut bits = vec![false; CELLS];
    for (i, v) in cells.iter().enumerate() {
        bits[i] = *v >= mean;
    }

    Some(pack_hex(&bits))
}

fn pack_hex(bits: &[bool]) -> String {
    let mut out = String::with_capacity(bits.len() / 4);
    for nibble in bits.chunks(4) {
        let mut v: u8 = 0;
        for (i, bit) in nibble.iter().enumerate() {
            if *bit {
                v |= 1 << (3 - i);
            }
        }
        out.push(std::char::from_digit(v as u32, 16).unwrap());
    }
    out
}

/// Bit-distance between two 64-hex-character hashes. Returns -1 when the
/// lengths differ (incomparable) rather than panicking.
pub fn hamming(a: &str, b: &str) -> i32 {
    if a.len() != b.len() {
        return -1;
    }

    let mut distance = 0i32;
    for (ca, cb) in a.chars().zip(b.chars()) {
        let (Some(na), Some(nb)) = (ca.to_digit(16), cb.to_digit(16)) else {
            return -1;
        };
        distance += (na ^ nb).count_ones() as i32;
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_is_symmetric_and_zero_for_equal_hashes() {
        let a = "0".repeat(64);
        let b = "f".repeat(64);
        assert_eq!(hamming(&a, &a), 0);
        assert_eq!(hamming(&a, &b), hamming(&b, &a));
        assert_eq!(hamming(&a, &b), 256);
    }

    #[test]
    fn hamming_rejects_length_mismatch() {
        assert_eq!(hamming("ab", "abc"), -1);
    }

    #[test]
    fn phash_bytes_rejects_garbage() {
        assert!(phash_bytes(b"not an image").is_none());
    }

    #[test]
    fn phash_bytes_produces_64_hex_chars_for_a_real_image() {
        let mut img = image::RgbImage::new(32, 32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = if x < 16 && y < 16 { 255 } else { 0 };
            *px = image::Rgb([v, v, v]);
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let hash = phash_bytes(&bytes).expect("hash should compute");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
