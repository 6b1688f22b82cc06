//! # Simulated camera
//!
//! Provides an [`ImageSource`] rendering a top-down view of the ground around the robot, so that the
//! executable can serve images without a rendering engine.
//!
//! The view is centred on the robot and rotated with it, the robot's forward direction pointing to
//! the top of the image. The ground is a checkerboard, with a red disc marking a fixed target
//! position.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex};
use image::{DynamicImage, Rgb, RgbImage};
use serde::Deserialize;

use comms_if::eqpt::cam::{encode_image, CamError, ImageFormat, ImageSource};
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const LIGHT_SQUARE: Rgb<u8> = Rgb([200, 200, 200]);
const DARK_SQUARE: Rgb<u8> = Rgb([90, 90, 90]);
const TARGET: Rgb<u8> = Rgb([220, 30, 30]);
const ROBOT: Rgb<u8> = Rgb([30, 90, 220]);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose shared between the control loop, which writes it, and the camera, which reads it.
pub type SharedPose = Arc<Mutex<Pose>>;

/// Parameters of the simulated camera.
#[derive(Debug, Clone, Deserialize)]
pub struct SimCamParams {
    /// Units: pixels
    pub cam_width: u32,

    /// Units: pixels
    pub cam_height: u32,

    /// JPEG quality between 1 and 100
    pub cam_jpeg_quality: u8,

    /// Width of ground covered by the image.
    ///
    /// Units: meters
    pub cam_view_width_m: f64,

    /// Units: meters
    pub cam_checker_size_m: f64,

    /// Target position in the LM frame.
    ///
    /// Units: meters
    pub cam_target_pos_m: [f64; 2],

    /// Units: meters
    #[serde(default = "default_target_radius")]
    pub cam_target_radius_m: f64,
}

/// The simulated camera.
pub struct SimCam {
    params: SimCamParams,

    pose: SharedPose,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimCamParams {
    fn default() -> Self {
        Self {
            cam_width: 320,
            cam_height: 240,
            cam_jpeg_quality: 75,
            cam_view_width_m: 4.0,
            cam_checker_size_m: 0.5,
            cam_target_pos_m: [2.0, 0.0],
            cam_target_radius_m: default_target_radius(),
        }
    }
}

impl SimCam {
    /// Create a new camera looking at the shared pose.
    pub fn new(params: SimCamParams, pose: SharedPose) -> Self {
        Self {
            params,
            pose
        }
    }

    /// Render the view from the given pose.
    pub fn render(&self, pose: &Pose) -> RgbImage {
        let w = self.params.cam_width.max(1);
        let h = self.params.cam_height.max(1);
        let m_per_px = self.params.cam_view_width_m / w as f64;
        let checker = self.params.cam_checker_size_m.abs().max(f64::EPSILON);

        let heading = pose.heading_rad();
        let (sin_h, cos_h) = heading.sin_cos();
        let pos = pose.position_m_lm;

        let target = self.params.cam_target_pos_m;
        let target_r2 = self.params.cam_target_radius_m.powi(2);
        let robot_r2 = (4.0 * m_per_px).powi(2);

        RgbImage::from_fn(w, h, |u, v| {
            // Body frame offset of the pixel centre, forward is up the image and left is left
            let fwd_m = (h as f64 / 2.0 - v as f64 - 0.5) * m_per_px;
            let left_m = (w as f64 / 2.0 - u as f64 - 0.5) * m_per_px;

            if fwd_m.powi(2) + left_m.powi(2) <= robot_r2 {
                return ROBOT
            }

            let x = pos.x + fwd_m * cos_h - left_m * sin_h;
            let y = pos.y + fwd_m * sin_h + left_m * cos_h;

            if (x - target[0]).powi(2) + (y - target[1]).powi(2) <= target_r2 {
                return TARGET
            }

            let cell = (x / checker).floor() as i64 + (y / checker).floor() as i64;
            if cell.rem_euclid(2) == 0 {
                LIGHT_SQUARE
            }
            else {
                DARK_SQUARE
            }
        })
    }
}

impl ImageSource for SimCam {
    fn capture(&mut self) -> Result<Vec<u8>, CamError> {
        // Copy the pose out so the control loop is not held up by the rendering
        let pose = match self.pose.lock() {
            Ok(p) => *p,
            Err(_) => return Err(CamError::NoFrame)
        };

        let img = DynamicImage::ImageRgb8(self.render(&pose));

        encode_image(&img, ImageFormat::Jpeg(self.params.cam_jpeg_quality))
    }
}

fn default_target_radius() -> f64 {
    0.2
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::GenericImageView;

    fn params() -> SimCamParams {
        SimCamParams {
            cam_width: 40,
            cam_height: 40,
            cam_view_width_m: 4.0,
            cam_checker_size_m: 1.0,
            cam_target_pos_m: [1.5, 0.0],
            cam_target_radius_m: 0.3,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_follows_pose() {
        let cam = SimCam::new(params(), Arc::new(Mutex::new(Pose::default())));

        // 0.1 m per pixel, the target is 15 px ahead of the centre
        let img = cam.render(&Pose::default());
        assert_eq!(*img.get_pixel(20, 20), ROBOT);
        assert_eq!(*img.get_pixel(19, 5), TARGET);

        // Turned to face left the target is off to the right of the image
        let img = cam.render(&Pose::from_xy_heading(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        assert_ne!(*img.get_pixel(19, 5), TARGET);
        assert_eq!(*img.get_pixel(35, 19), TARGET);
    }

    #[test]
    fn test_capture_jpeg() {
        let pose = Arc::new(Mutex::new(Pose::from_xy_heading(0.3, -0.2, 1.0)));
        let mut cam = SimCam::new(params(), pose);

        let data = cam.capture().unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 40);
    }
}
