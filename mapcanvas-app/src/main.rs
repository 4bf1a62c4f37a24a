use anyhow::Context;
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use mapcanvas::{
    core::transform,
    prelude::*,
};
use std::path::PathBuf;

/// Paints a checkerboard of 10 map-unit cells so zooming and panning are visible
struct Checkerboard;

#[async_trait]
impl AsyncRasterizer for Checkerboard {
    async fn rasterize(&self, job: RasterJob) -> Result<RenderedMap> {
        let mut region = job.region;
        region.set_size(job.width, job.height);

        let mut image = RgbaImage::new(job.width, job.height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let Some(coords) = transform::pixel_to_geo(Point::new(x as f64, y as f64), &region) else {
                continue;
            };
            let cell = ((coords.x / 10.0).floor() + (coords.y / 10.0).floor()) as i64;
            let shade = if cell.rem_euclid(2) == 0 { 200 } else { 120 };
            *pixel = Rgba([shade, shade, 255 - shade / 2, 255]);
        }
        Ok(RenderedMap::new(image))
    }
}

fn settle(canvas: &mut MapCanvas) {
    for _ in 0..4 {
        if !canvas.flush(Duration::from_secs(2)) {
            break;
        }
    }
    for event in canvas.process_events() {
        log::info!("event: {:?}", event);
    }
}

fn drag(canvas: &mut MapCanvas, from: (f64, f64), to: (f64, f64)) {
    canvas.handle_mouse(MouseEvent::left_down(from.0, from.1));
    canvas.handle_mouse(MouseEvent::drag((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
    canvas.handle_mouse(MouseEvent::drag(to.0, to.1));
    canvas.handle_mouse(MouseEvent::left_up(to.0, to.1));
}

/// Drives a canvas through a scripted session and writes the result as PNG
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mapcanvas::init_logging();

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mapcanvas-demo.png"));

    let spawner = TokioSpawner::current().context("no tokio runtime")?;
    let region = Region::new(Extent::new(100.0, 0.0, 100.0, 0.0), 400, 300);
    let renderer = AsyncRenderer::new(Checkerboard, Arc::new(spawner), region);

    let properties = CanvasProperties {
        show_region_box: true,
        ..CanvasProfile::Interactive.resolve()
    };
    let mut canvas = MapCanvas::new(Box::new(renderer), properties);
    canvas.on(EventKind::ZoomChanged, |event| {
        if let CanvasEvent::ZoomChanged { extent } = event {
            log::info!("display extent is now {:?}", extent);
        }
    });

    let mut waypoints = GraphicsSet::new(GraphicsKind::Point).with_status(|item, order| {
        if order == 0 {
            item.pen_name = Some("highest".to_string());
        }
    });
    waypoints.add_item(vec![Point::new(30.0, 30.0)], None, Some("start"), false);
    waypoints.add_item(vec![Point::new(50.0, 60.0)], Some("selected"), Some("via"), false);
    waypoints.add_item(vec![Point::new(70.0, 40.0)], None, Some("end"), false);
    canvas.register_graphics(waypoints);

    canvas.update_map(true, true);
    settle(&mut canvas);

    canvas.set_mouse_use(MouseUse::Zoom);
    drag(&mut canvas, (100.0, 75.0), (300.0, 225.0));
    settle(&mut canvas);

    canvas.handle_mouse(MouseEvent::wheel(200.0, 150.0, -120));
    settle(&mut canvas);

    canvas.set_mouse_use(MouseUse::Pan);
    drag(&mut canvas, (200.0, 150.0), (160.0, 170.0));
    settle(&mut canvas);

    canvas.handle_key(KeyCode::ArrowRight.into());
    settle(&mut canvas);

    canvas.set_mouse_use(MouseUse::Measure);
    for (x, y) in [(50.0, 50.0), (150.0, 90.0), (260.0, 60.0)] {
        canvas.handle_mouse(MouseEvent::left_down(x, y));
        canvas.handle_mouse(MouseEvent::left_up(x, y));
    }
    let points = canvas.polycoords().to_vec();
    let length: f64 = points
        .windows(2)
        .filter_map(|pair| canvas.distance(pair[0], pair[1], false))
        .map(|(dist, _)| dist)
        .sum();
    log::info!("measured {:.2} map units along {} vertices", length, points.len());

    canvas.add_text(TextInfo::new("mapcanvas", Point::new(10.0, 10.0)).with_color(Color::BLACK));
    canvas.update_map(false, true);
    settle(&mut canvas);

    canvas
        .save_to_file(&output, ImageFormat::Png, 800, 600)
        .with_context(|| format!("cannot export to {}", output.display()))?;
    settle(&mut canvas);

    let (width, height) = canvas.paint().dimensions();
    println!(
        "frame {}x{}, history depth {}, exported {}",
        width,
        height,
        canvas.zoom_history().len(),
        output.display()
    );
    Ok(())
}
