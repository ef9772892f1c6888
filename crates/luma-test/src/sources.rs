//! Synthetic frame sources
//!
//! Scenes are drawn with flat colours chosen to sit clearly on either side of
//! the skin-tone rule, so analysis results are predictable.

use luma_core::{Frame, FrameSize, LumaError, LumaResult};
use luma_runtime::FrameSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Skin-toned fill
pub const SKIN: [u8; 4] = [200, 140, 110, 255];
/// Cool, non-skin background
pub const WALL: [u8; 4] = [40, 60, 90, 255];

const DEFAULT_SEED: u64 = 42;

/// One frame's worth of synthetic content
#[derive(Clone, Debug, PartialEq)]
pub enum Scene {
    /// Uniform colour
    Solid([u8; 4]),
    /// Background only
    Empty,
    /// A face-sized skin block. `centre` and `width` are fractions of the
    /// frame width; the block spans the middle 60% of the height.
    Face { centre: f32, width: f32 },
    /// Two separated faces
    TwoFaces,
    /// Uniform random pixels
    Noise,
    /// The source has no new frame this tick
    Gap,
    /// The device drops out for this tick
    Unavailable,
}

impl Scene {
    /// A face in the middle of the frame
    pub fn centred_face() -> Self {
        Scene::Face {
            centre: 0.5,
            width: 0.4,
        }
    }

    /// A face pushed towards the right edge
    pub fn face_right() -> Self {
        Scene::Face {
            centre: 0.8,
            width: 0.4,
        }
    }

    /// Draw the scene. `None` for scenes that produce no frame.
    pub fn render(&self, size: FrameSize, rng: &mut StdRng) -> Option<Frame> {
        let frame = match self {
            Scene::Solid(rgba) => Frame::filled(size, *rgba),
            Scene::Empty => Frame::filled(size, WALL),
            Scene::Face { centre, width } => {
                let mut frame = Frame::filled(size, WALL);
                paint_face(&mut frame, *centre, *width);
                frame
            }
            Scene::TwoFaces => {
                let mut frame = Frame::filled(size, WALL);
                paint_face(&mut frame, 0.225, 0.25);
                paint_face(&mut frame, 0.775, 0.25);
                frame
            }
            Scene::Noise => {
                let mut frame = Frame::new(size);
                rng.fill(frame.as_bytes_mut());
                frame
            }
            Scene::Gap | Scene::Unavailable => return None,
        };
        Some(frame)
    }
}

fn paint_face(frame: &mut Frame, centre: f32, width: f32) {
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let half = (width * w / 2.0).round();
    let x0 = (centre * w - half).round().max(0.0) as u32;
    let x1 = ((centre * w + half).round() as u32).min(frame.width());
    let y0 = (h / 5.0).round() as u32;
    let y1 = ((h * 4.0 / 5.0).round() as u32).min(frame.height());

    for y in y0..y1 {
        for x in x0..x1 {
            frame.set_pixel(x, y, SKIN);
        }
    }
}

/// Plays a fixed script of scenes, then holds the last one
#[derive(Debug)]
pub struct SceneSource {
    size: FrameSize,
    script: Vec<Scene>,
    cursor: usize,
    rng: StdRng,
    open: bool,
    opened: u32,
    served: u64,
}

impl SceneSource {
    pub fn new(size: FrameSize, script: Vec<Scene>) -> Self {
        Self::with_seed(size, script, DEFAULT_SEED)
    }

    pub fn with_seed(size: FrameSize, script: Vec<Scene>, seed: u64) -> Self {
        SceneSource {
            size,
            script,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
            open: false,
            opened: 0,
            served: 0,
        }
    }

    /// A source that shows the same scene forever
    pub fn constant(size: FrameSize, scene: Scene) -> Self {
        Self::new(size, vec![scene])
    }

    /// Frames handed out so far
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Number of successful opens
    pub fn open_count(&self) -> u32 {
        self.opened
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn next_scene(&mut self) -> Scene {
        let index = self.cursor.min(self.script.len().saturating_sub(1));
        self.cursor += 1;
        self.script.get(index).cloned().unwrap_or(Scene::Empty)
    }
}

impl FrameSource for SceneSource {
    fn open(&mut self, _requested: FrameSize) -> LumaResult<FrameSize> {
        self.open = true;
        self.opened += 1;
        Ok(self.size)
    }

    fn next_frame(&mut self) -> LumaResult<Option<Frame>> {
        if !self.open {
            return Err(LumaError::SourceUnavailable("source not opened".into()));
        }
        let scene = self.next_scene();
        if scene == Scene::Unavailable {
            return Err(LumaError::SourceUnavailable("device dropped out".into()));
        }
        let frame = scene.render(self.size, &mut self.rng);
        if frame.is_some() {
            self.served += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// A source whose device can never be opened
#[derive(Debug, Default)]
pub struct OfflineSource;

impl FrameSource for OfflineSource {
    fn open(&mut self, _requested: FrameSize) -> LumaResult<FrameSize> {
        Err(LumaError::SourceUnavailable("no capture device".into()))
    }

    fn next_frame(&mut self) -> LumaResult<Option<Frame>> {
        Err(LumaError::SourceUnavailable("no capture device".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: FrameSize = FrameSize::new(40, 30);

    #[test]
    fn test_face_geometry() {
        let mut rng = StdRng::seed_from_u64(7);
        let frame = Scene::centred_face().render(SIZE, &mut rng).unwrap();
        assert_eq!(frame.pixel(12, 6), SKIN);
        assert_eq!(frame.pixel(27, 23), SKIN);
        assert_eq!(frame.pixel(11, 6), WALL);
        assert_eq!(frame.pixel(28, 6), WALL);
        assert_eq!(frame.pixel(20, 24), WALL);
        assert_eq!(frame.pixel(20, 5), WALL);
    }

    #[test]
    fn test_noise_is_seeded() {
        let render = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            Scene::Noise.render(SIZE, &mut rng).unwrap()
        };
        assert_eq!(render(3), render(3));
        assert_ne!(render(3), render(4));
    }

    #[test]
    fn test_script_holds_last_scene() {
        let mut source = SceneSource::new(
            SIZE,
            vec![Scene::Gap, Scene::Unavailable, Scene::Solid([9, 9, 9, 255])],
        );
        assert!(source.next_frame().is_err());

        source.open(SIZE).unwrap();
        assert_eq!(source.next_frame().unwrap(), None);
        assert!(matches!(
            source.next_frame(),
            Err(LumaError::SourceUnavailable(_))
        ));
        for _ in 0..3 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.pixel(0, 0), [9, 9, 9, 255]);
        }
        assert_eq!(source.served(), 3);

        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_offline_source() {
        let mut source = OfflineSource;
        assert!(source.open(SIZE).unwrap_err().is_recoverable());
    }
}
