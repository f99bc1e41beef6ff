//! Interactive view over a volume.
//!
//! [`ViewState`] holds the (space, plane, slice) selection and keeps the slice
//! inside the active raster. [`SliceViewer`] pairs that state with a shared
//! volume and repaints a [`Frame`] after every change.

use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::config::ViewerConfig;
use crate::enums::{Plane, Space};
use crate::normalizer::DisplayCeiling;
use crate::rasterizer::SliceRasterizer;
use crate::space::{SpaceDescriptor, SpaceResolver};
use crate::volume::Volume;

/// Current plane, space and slice of one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    plane: Plane,
    space: Space,
    slice: usize,
    max_slice: usize,
}

impl ViewState {
    /// Start at the middle slice of `(space, plane)`.
    pub fn new(space: Space, plane: Plane, resolver: &SpaceResolver) -> Self {
        let descriptor = resolver.resolve(space, plane);
        Self {
            plane,
            space,
            slice: descriptor.mid_slice(),
            max_slice: descriptor.max_slice(),
        }
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn space(&self) -> Space {
        self.space
    }

    pub fn slice(&self) -> usize {
        self.slice
    }

    pub fn max_slice(&self) -> usize {
        self.max_slice
    }

    fn recentre(&mut self, resolver: &SpaceResolver) {
        let descriptor = resolver.resolve(self.space, self.plane);
        self.max_slice = descriptor.max_slice();
        self.slice = descriptor.mid_slice();
    }

    /// Switch plane and jump to its middle slice.
    pub fn set_plane(&mut self, plane: Plane, resolver: &SpaceResolver) {
        self.plane = plane;
        self.recentre(resolver);
    }

    /// Switch space and jump to the middle slice of the current plane.
    pub fn set_space(&mut self, space: Space, resolver: &SpaceResolver) {
        self.space = space;
        self.recentre(resolver);
    }

    /// Move to slice `n`, clamped to `0..=max_slice`.
    pub fn set_slice(&mut self, n: i64) {
        self.slice = usize::try_from(n.max(0))
            .unwrap_or(usize::MAX)
            .min(self.max_slice);
    }

    pub fn next_slice(&mut self) {
        self.set_slice(self.slice as i64 + 1);
    }

    pub fn previous_slice(&mut self) {
        self.set_slice(self.slice as i64 - 1);
    }
}

/// A painted slice plus what a host needs to caption it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image: RgbaImage,
    pub space: Space,
    pub plane: Plane,
    pub slice: usize,
    pub max_slice: usize,
    pub descriptor: SpaceDescriptor,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height on screen once non-square pixels are corrected.
    pub fn display_height(&self) -> u32 {
        self.descriptor.display_height() as u32
    }

    /// The raster stretched to its physical aspect ratio.
    pub fn to_display_image(&self) -> RgbaImage {
        let height = self.display_height();
        if height == self.height() {
            return self.image.clone();
        }
        imageops::resize(&self.image, self.width(), height, FilterType::Triangle)
    }

    pub fn caption(&self) -> String {
        format!(
            "{} {} {}/{}",
            self.space, self.plane, self.slice, self.max_slice
        )
    }
}

/// Receives finished frames.
pub trait FrameSink {
    fn present(&mut self, frame: &Frame);
}

impl<F> FrameSink for F
where
    F: FnMut(&Frame),
{
    fn present(&mut self, frame: &Frame) {
        self(frame)
    }
}

/// One independent view of a shared volume.
pub struct SliceViewer {
    volume: Arc<Volume>,
    config: ViewerConfig,
    resolver: SpaceResolver,
    ceiling: DisplayCeiling,
    state: ViewState,
    frame: Frame,
    repaints: u64,
}

impl SliceViewer {
    /// Set up a sagittal view in the configured default space and paint it.
    pub fn initialize(volume: Arc<Volume>, config: ViewerConfig) -> Self {
        let ceiling = DisplayCeiling::from_volume(&volume);
        Self::with_ceiling(volume, config, ceiling)
    }

    /// Like [`SliceViewer::initialize`], reusing a ceiling computed elsewhere,
    /// e.g. by another view of the same volume.
    pub fn with_ceiling(
        volume: Arc<Volume>,
        config: ViewerConfig,
        ceiling: DisplayCeiling,
    ) -> Self {
        let resolver = SpaceResolver::new(&volume, config.cube_scale);
        let state = ViewState::new(config.default_space, Plane::default(), &resolver);
        let frame = Self::paint(&volume, &resolver, ceiling, &config, &state);
        Self {
            volume,
            config,
            resolver,
            ceiling,
            state,
            frame,
            repaints: 1,
        }
    }

    fn paint(
        volume: &Volume,
        resolver: &SpaceResolver,
        ceiling: DisplayCeiling,
        config: &ViewerConfig,
        state: &ViewState,
    ) -> Frame {
        let rasterizer = SliceRasterizer::new(
            volume,
            resolver,
            ceiling,
            config,
            state.space,
            state.plane,
            state.slice,
        );
        let descriptor = *rasterizer.descriptor();
        tracing::debug!(
            space = %state.space,
            plane = %state.plane,
            slice = state.slice,
            width = descriptor.width,
            height = descriptor.height,
            "repaint"
        );
        Frame {
            image: rasterizer.rasterize(),
            space: state.space,
            plane: state.plane,
            slice: state.slice,
            max_slice: state.max_slice,
            descriptor,
        }
    }

    fn repaint(&mut self) {
        self.frame = Self::paint(
            &self.volume,
            &self.resolver,
            self.ceiling,
            &self.config,
            &self.state,
        );
        self.repaints += 1;
    }

    pub fn set_plane(&mut self, plane: Plane) {
        tracing::debug!(from = %self.state.plane, to = %plane, "set plane");
        self.state.set_plane(plane, &self.resolver);
        self.repaint();
    }

    pub fn set_space(&mut self, space: Space) {
        tracing::debug!(from = %self.state.space, to = %space, "set space");
        self.state.set_space(space, &self.resolver);
        self.repaint();
    }

    /// Move to slice `n` (clamped) and repaint, even when nothing changed.
    pub fn set_slice(&mut self, n: i64) {
        self.state.set_slice(n);
        tracing::debug!(requested = n, slice = self.state.slice, "set slice");
        self.repaint();
    }

    pub fn next_slice(&mut self) {
        self.set_slice(self.state.slice as i64 + 1);
    }

    pub fn previous_slice(&mut self) {
        self.set_slice(self.state.slice as i64 - 1);
    }

    /// Hand the current frame to `sink`.
    pub fn render(&self, sink: &mut impl FrameSink) {
        sink.present(&self.frame);
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn volume(&self) -> &Arc<Volume> {
        &self.volume
    }

    pub fn ceiling(&self) -> DisplayCeiling {
        self.ceiling
    }

    pub fn resolver(&self) -> &SpaceResolver {
        &self.resolver
    }

    /// Number of frames painted so far, including the initial one.
    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }
}
