//! Texture images owned by the scene and their GPU uploads.
//!
//! Images live on the CPU as RGBA8 data until the renderer first binds them;
//! [`GpuTexture::upload`] then creates the matching 2D or cube texture.

use glam::{Vec2, Vec3, Vec4};

use crate::gpu::GpuContext;

/// Handle of an image in [`Textures`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// A 2D RGBA8 image, first row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture2d {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Texture2d {
    /// Creates a texture from raw RGBA8 data. Missing texels are transparent black.
    pub fn from_rgba(data: &[u8], width: u32, height: u32) -> Self {
        let len = (width * height * 4) as usize;
        let mut data = data[..data.len().min(len)].to_vec();
        data.resize(len, 0);
        Self {
            width,
            height,
            data,
        }
    }

    /// Creates a texture from a decoded image.
    pub fn from_image(image: &image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(image.as_raw(), width, height)
    }

    /// A 1x1 texture of one color.
    pub fn solid(color: Vec4) -> Self {
        Self::from_rgba(&to_rgba8(color), 1, 1)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The texel at `(x, y)`, or `None` outside the image.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Procedural grass: blocky green noise.
    pub fn grass(size: u32, seed: u32) -> Self {
        const GREENS: &[[u8; 3]] = &[[86, 125, 70], [75, 115, 60], [95, 135, 75], [80, 120, 65]];
        Self::palette_noise(size, seed, GREENS, 20)
    }

    /// Procedural sand: fine light-brown noise.
    pub fn sand(size: u32, seed: u32) -> Self {
        const SANDS: &[[u8; 3]] = &[
            [194, 178, 128],
            [204, 186, 140],
            [180, 162, 112],
            [210, 196, 150],
        ];
        Self::palette_noise(size, seed, SANDS, 16)
    }

    /// Procedural gravel: gray stones of 4x4 texels with darker cracks between them.
    pub fn gravel(size: u32, seed: u32) -> Self {
        const GRAYS: &[[u8; 3]] = &[
            [128, 128, 128],
            [100, 100, 100],
            [150, 150, 150],
            [90, 90, 90],
            [140, 140, 140],
            [110, 110, 110],
        ];
        let mut data = vec![0u8; (size * size * 4) as usize];
        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let base = GRAYS[(hash(x / 4, y / 4, seed) % GRAYS.len() as u32) as usize];
                let variation = (hash(x, y, seed.wrapping_add(12345)) % 16) as i32 - 8;
                let in_crack =
                    (x % 4 == 0 || y % 4 == 0) && hash(x, y, seed.wrapping_add(999)) % 3 == 0;
                let darken = if in_crack { -20 } else { 0 };
                for c in 0..3 {
                    data[idx + c] = (base[c] as i32 + variation + darken).clamp(0, 255) as u8;
                }
                data[idx + 3] = 255;
            }
        }
        Self::from_rgba(&data, size, size)
    }

    /// Checkerboard of `a` and `b` with `cells` squares per side.
    pub fn checker(size: u32, cells: u32, a: Vec4, b: Vec4) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let (a, b) = (to_rgba8(a), to_rgba8(b));
        let data = (0..size * size)
            .flat_map(|i| {
                let (x, y) = (i % size, i / size);
                if (x / cell + y / cell) % 2 == 0 { a } else { b }
            })
            .collect::<Vec<_>>();
        Self::from_rgba(&data, size, size)
    }

    fn palette_noise(size: u32, seed: u32, palette: &[[u8; 3]], spread: u32) -> Self {
        let mut data = vec![0u8; (size * size * 4) as usize];
        let half = (spread / 2) as i32;
        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let base = palette[(hash(x, y, seed) % palette.len() as u32) as usize];
                let variation = (hash(x + 500, y + 500, seed) % spread) as i32 - half;
                for c in 0..3 {
                    data[idx + c] = (base[c] as i32 + variation).clamp(0, 255) as u8;
                }
                data[idx + 3] = 255;
            }
        }
        Self::from_rgba(&data, size, size)
    }
}

/// Integer hash for procedural texels.
fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

/// Six square faces in the order +X, -X, +Y, -Y, +Z, -Z.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubeMap {
    faces: [Texture2d; 6],
}

impl CubeMap {
    pub fn new(faces: [Texture2d; 6]) -> Self {
        Self { faces }
    }

    /// Vertical gradient sky: `zenith` straight up, `horizon` around, `ground` below.
    pub fn gradient(size: u32, zenith: Vec4, horizon: Vec4, ground: Vec4) -> Self {
        let face = |index: usize| {
            let data = (0..size * size)
                .flat_map(|i| {
                    let (x, y) = (i % size, i / size);
                    let uv = Vec2::new(
                        (x as f32 + 0.5) / size as f32,
                        (y as f32 + 0.5) / size as f32,
                    );
                    let dir = face_direction(index, uv * 2.0 - Vec2::ONE).normalize();
                    let color = if dir.y >= 0.0 {
                        horizon.lerp(zenith, dir.y)
                    } else {
                        horizon.lerp(ground, (-dir.y).min(1.0))
                    };
                    to_rgba8(color)
                })
                .collect::<Vec<_>>();
            Texture2d::from_rgba(&data, size, size)
        };
        Self::new([face(0), face(1), face(2), face(3), face(4), face(5)])
    }

    pub fn face(&self, index: usize) -> Option<&Texture2d> {
        self.faces.get(index)
    }

    /// Edge length of a face. Faces are expected to share it.
    pub fn size(&self) -> u32 {
        self.faces[0].width
    }
}

/// Direction through texel `st` (in `[-1, 1]²`) of cube face `face`.
fn face_direction(face: usize, st: Vec2) -> Vec3 {
    let (s, t) = (st.x, st.y);
    match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    }
}

/// An image the scene can bind to a texture unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureData {
    Flat(Texture2d),
    Cube(CubeMap),
}

impl From<Texture2d> for TextureData {
    fn from(texture: Texture2d) -> Self {
        Self::Flat(texture)
    }
}

impl From<CubeMap> for TextureData {
    fn from(cube: CubeMap) -> Self {
        Self::Cube(cube)
    }
}

/// Arena of scene images. Ids stay valid for the life of the arena.
#[derive(Default)]
pub struct Textures {
    images: Vec<TextureData>,
}

impl Textures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, image: impl Into<TextureData>) -> TextureId {
        self.images.push(image.into());
        TextureId(self.images.len() - 1)
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureData> {
        self.images.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A scene image uploaded to the GPU.
#[derive(Debug)]
pub struct GpuTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) is_cube: bool,
}

impl GpuTexture {
    /// Uploads `image` as a 2D texture or a six-layer cube texture.
    ///
    /// Texels are stored as `Rgba8Unorm` so shaders see the bytes as written,
    /// with no sRGB decode.
    pub fn upload(gpu: &GpuContext, image: &TextureData, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let (width, height, layers, data) = match image {
            TextureData::Flat(texture) => (
                texture.width.max(1),
                texture.height.max(1),
                1,
                padded(texture),
            ),
            TextureData::Cube(cube) => {
                let size = cube.size().max(1);
                let data = cube.faces.iter().flat_map(padded).collect::<Vec<_>>();
                (size, size, 6, data)
            }
        };

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: layers,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );

        let is_cube = layers == 6;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(if is_cube {
                wgpu::TextureViewDimension::Cube
            } else {
                wgpu::TextureViewDimension::D2
            }),
            ..Default::default()
        });

        log::debug!("uploaded {} ({}x{}x{})", label, width, height, layers);
        Self {
            texture,
            view,
            is_cube,
        }
    }

    /// A 1x1 white stand-in for unbound 2D units.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::upload(
            gpu,
            &TextureData::Flat(Texture2d::solid(Vec4::ONE)),
            "Default White Texture",
        )
    }

    /// A 1x1 black stand-in for an unbound cube unit.
    pub fn black_cube(gpu: &GpuContext) -> Self {
        let face = Texture2d::solid(Vec4::new(0.0, 0.0, 0.0, 1.0));
        let faces = [(); 6].map(|_| face.clone());
        Self::upload(
            gpu,
            &TextureData::Cube(CubeMap::new(faces)),
            "Default Cube Texture",
        )
    }
}

/// Image data with at least one texel, so empty images still upload.
fn padded(texture: &Texture2d) -> Vec<u8> {
    if texture.data.is_empty() {
        vec![0; 4]
    } else {
        texture.data.clone()
    }
}
