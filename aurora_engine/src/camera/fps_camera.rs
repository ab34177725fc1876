//! Free-flying FPS camera
//!
//! Driven each frame from a plain input snapshot supplied by the window
//! layer; the engine never reads the windowing API directly. Aspect ratio
//! follows the framebuffer resolution, so it is correct within one frame
//! of a resize.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4Swizzles};

/// View/projection matrices derived from the camera state
#[derive(Debug, Clone, Copy)]
pub struct CameraProperties {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
}

/// One frame of camera-relevant input, translated from the window layer
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraInput {
    /// Forward/backward axis in [-1, 1]
    pub forward: f32,
    /// Strafe axis in [-1, 1]
    pub right: f32,
    /// Fly up/down axis in [-1, 1]
    pub up: f32,
    /// Speed multiplier while boosting (1.0 = no boost)
    pub boost: f32,
    /// Cursor movement in pixels since the previous frame
    pub cursor_delta: Vec2,
    /// Whether the rotate button is held
    pub rotating: bool,
}

pub struct FpsCamera {
    pub origin: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub move_speed: f32,
    pub up_speed: f32,
    pub rotate_speed: f32,
    is_moved: bool,
}

impl FpsCamera {
    pub fn new(origin: Vec3, lookat: Vec3, up: Vec3, fov_y: f32, aspect_ratio: f32) -> Self {
        Self {
            origin,
            direction: (lookat - origin).normalize(),
            up,
            fov_y,
            aspect_ratio,
            move_speed: 0.2,
            up_speed: 0.2,
            rotate_speed: 4.0,
            is_moved: false,
        }
    }

    /// Advance the camera one frame.
    ///
    /// `allow_input` is false while the UI layer has focus, so the camera
    /// does not react to events the UI consumed. The aspect ratio always
    /// tracks `resolution`.
    pub fn update(
        &mut self,
        input: &CameraInput,
        resolution: UVec2,
        frame_time: f32,
        allow_input: bool,
    ) {
        let mut cursor_move = Vec2::ZERO;

        if allow_input {
            let boost = if input.boost > 0.0 { input.boost } else { 1.0 };
            self.move_forward(input.forward * self.move_speed * frame_time * boost);
            self.move_right(input.right * self.move_speed * frame_time * boost);
            self.fly_up(input.up * self.up_speed * frame_time * boost);

            if input.rotating {
                cursor_move = input.cursor_delta;
                let resolution = Vec2::new(resolution.x as f32, resolution.y as f32);
                self.rotate(self.rotate_speed * cursor_move / resolution);
            }
        }

        self.is_moved = allow_input
            && (input.forward != 0.0
                || input.right != 0.0
                || input.up != 0.0
                || cursor_move.length_squared() != 0.0);

        if resolution.y != 0 {
            self.aspect_ratio = resolution.x as f32 / resolution.y as f32;
        }
    }

    /// Whether the last update changed the camera pose
    pub fn is_moved(&self) -> bool {
        self.is_moved
    }

    pub fn move_forward(&mut self, amount: f32) {
        self.origin += amount * self.direction;
    }

    pub fn move_right(&mut self, amount: f32) {
        let side_axis = self.direction.cross(self.up);
        self.origin += side_axis * amount;
    }

    pub fn fly_up(&mut self, amount: f32) {
        self.origin += amount * self.up;
    }

    pub fn rotate(&mut self, amount: Vec2) {
        let rotate_x = Mat4::from_axis_angle(self.up, -amount.x);
        self.direction = (rotate_x * self.direction.extend(0.0)).xyz();

        let side_axis = self.direction.cross(self.up);
        let rotate_y = Mat4::from_axis_angle(side_axis, -amount.y);
        self.direction = (rotate_y * self.direction.extend(0.0)).xyz();
    }

    /// Right-handed view and projection for the current pose
    pub fn camera_props(&self) -> CameraProperties {
        let view = Mat4::look_at_rh(self.origin, self.origin + self.direction, self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect_ratio, 0.01, 100.0);
        CameraProperties {
            view,
            proj,
            view_proj: proj * view,
        }
    }
}

#[cfg(test)]
#[path = "fps_camera_tests.rs"]
mod tests;
