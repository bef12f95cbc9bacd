//! Orbit camera, perspective projection and the damped interactive controller.
//!
//! The camera circles a target point at a distance; the controller turns raw
//! pointer/scroll input into yaw/pitch/zoom velocities that decay over time,
//! so releasing the mouse leaves the camera gliding to a stop instead of
//! freezing mid-motion.

use cgmath::{Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use instant::Duration;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Maps the OpenGL clip-space cube (z in -1..1) to wgpu's (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keep the pitch away from the poles so the look-at basis stays well defined.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.05;

/// A camera orbiting a target point.
#[derive(Debug, Clone)]
pub struct Camera {
    pub target: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    pub distance: f32,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, Y: Into<Rad<f32>>>(
        target: P,
        yaw: Y,
        pitch: Y,
        distance: f32,
    ) -> Self {
        Self {
            target: target.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            distance,
        }
    }

    /// World-space eye position derived from the orbit parameters.
    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let offset = Vector3::new(
            cos_pitch * cos_yaw,
            sin_pitch,
            cos_pitch * sin_yaw,
        ) * self.distance;
        self.target + offset
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }
}

/// Perspective projection; owns the aspect ratio kept in sync with the window.
#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Recompute the aspect ratio after the display area changed.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Turns pointer/scroll input into damped orbit motion.
///
/// Input adds velocity; [`update`](Self::update) applies it to the camera and
/// decays it exponentially, one step per frame.
#[derive(Debug)]
pub struct OrbitController {
    rotate_speed: f32,
    zoom_speed: f32,
    damping: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    dragging: bool,
}

impl OrbitController {
    /// `damping` is the exponential decay rate per second; higher settles faster.
    pub fn new(rotate_speed: f32, zoom_speed: f32, damping: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            damping,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            dragging: false,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                };
                self.zoom_velocity -= amount * self.zoom_speed;
            }
            _ => (),
        }
    }

    /// Raw pointer motion, forwarded from device events while dragging.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if self.dragging {
            self.yaw_velocity += dx as f32 * self.rotate_speed;
            self.pitch_velocity += dy as f32 * self.rotate_speed;
        }
    }

    /// Advance the damping/inertia by one step and apply it to the camera.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        camera.yaw += Rad(self.yaw_velocity * dt);
        camera.pitch += Rad(self.pitch_velocity * dt);
        camera.pitch.0 = camera.pitch.0.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        camera.distance = (camera.distance + self.zoom_velocity * dt).max(0.1);

        let decay = (-self.damping * dt).exp();
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;
        self.zoom_velocity *= decay;
    }

    #[cfg(test)]
    fn velocity_magnitude(&self) -> f32 {
        (self.yaw_velocity.powi(2) + self.pitch_velocity.powi(2) + self.zoom_velocity.powi(2))
            .sqrt()
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(0.5, 1.2, 6.0)
    }
}

/// Raw view-projection data uploaded to the camera uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.eye().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the renderer needs per camera: logical state plus GPU resources.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    #[test]
    fn projection_tracks_aspect_on_resize() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 500.0);
        assert_eq!(projection.aspect(), 800.0 / 600.0);

        projection.resize(1024, 768);
        assert_eq!(projection.aspect(), 1024.0 / 768.0);
    }

    #[test]
    fn controller_inertia_decays() {
        let mut controller = OrbitController::new(1.0, 1.0, 8.0);
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(-20.0), 5.0);

        controller.dragging = true;
        controller.handle_mouse(10.0, 4.0);
        let initial = controller.velocity_magnitude();
        assert!(initial > 0.0);

        for _ in 0..120 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        assert!(controller.velocity_magnitude() < initial * 1e-3);
    }

    #[test]
    fn pitch_is_clamped_below_the_pole() {
        let mut controller = OrbitController::new(10.0, 1.0, 0.5);
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0), 5.0);

        controller.dragging = true;
        controller.handle_mouse(0.0, 500.0);
        for _ in 0..60 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        assert!(camera.pitch.0 <= PITCH_LIMIT);
        assert!(camera.pitch.0 >= -PITCH_LIMIT);
    }

    #[test]
    fn released_drag_adds_no_velocity() {
        let mut controller = OrbitController::default();
        controller.handle_mouse(50.0, 50.0);
        assert_eq!(controller.velocity_magnitude(), 0.0);
    }
}
