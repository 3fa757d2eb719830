use image::RgbImage;

/// Blit `src` into `canvas` with its top-left at (dx, dy). Pixels falling
/// outside the canvas are clipped.
pub fn blit_rgb(src: &RgbImage, canvas: &mut RgbImage, dx: u32, dy: u32) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    for yy in 0..sh {
        if dy + yy >= ch {
            break;
        }
        for xx in 0..sw {
            if dx + xx >= cw {
                break;
            }
            let px = *src.get_pixel(xx, yy);
            canvas.put_pixel(dx + xx, dy + yy, px);
        }
    }
}
