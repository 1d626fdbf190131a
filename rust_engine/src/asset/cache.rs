//! 网格二进制缓存
//!
//! 小端序，字段顺序固定：
//! 版本号、名称、材质、顶点、索引、子网格、骨架（骨骼 + 名称映射）、剪辑、是否有动画。
//! 字符串为 u32 字节长度 + UTF-8，矩阵为 16 个按列存储的 f32。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::animation::{AnimationClip, FrameRate, KeyframeTrack};
use crate::model::{Material, MeshAsset, MeshKind, SkinnedVertex, SubMesh};
use crate::skeleton::{Bone, Skeleton};
use crate::{Result, SkinError};

/// 当前缓存格式版本
pub const CACHE_VERSION: u32 = 1;

/// 预分配上限，避免损坏的长度字段导致巨量分配
const MAX_PREALLOC: usize = 4096;

/// 写入网格缓存
pub fn save_mesh<W: Write>(mesh: &MeshAsset, writer: &mut W) -> Result<()> {
    writer.write_u32::<LittleEndian>(CACHE_VERSION)?;
    write_string(writer, &mesh.name)?;

    write_len(writer, mesh.materials.len())?;
    for material in &mesh.materials {
        write_material(writer, material)?;
    }

    write_len(writer, mesh.vertices.len())?;
    for vertex in &mesh.vertices {
        write_vertex(writer, vertex)?;
    }

    write_len(writer, mesh.indices.len())?;
    for &index in &mesh.indices {
        writer.write_u32::<LittleEndian>(index)?;
    }

    write_len(writer, mesh.subsets.len())?;
    for subset in &mesh.subsets {
        writer.write_u32::<LittleEndian>(subset.begin_index)?;
        writer.write_u32::<LittleEndian>(subset.index_count)?;
        writer.write_u32::<LittleEndian>(subset.material_index)?;
    }

    // 静态网格写入空骨架
    let empty = Skeleton::empty();
    let skeleton = mesh.skeleton().map_or(&empty, |s| s.as_ref());
    write_skeleton(writer, skeleton)?;

    write_len(writer, mesh.clips().len())?;
    for clip in mesh.clips() {
        write_clip(writer, clip)?;
    }

    writer.write_u8(mesh.has_animation_data() as u8)?;
    Ok(())
}

/// 读取网格缓存
///
/// 版本号不一致时只记录错误，仍按当前格式继续读取。
pub fn load_mesh<R: Read>(reader: &mut R) -> Result<MeshAsset> {
    let version = reader.read_u32::<LittleEndian>()?;
    if version != CACHE_VERSION {
        log::error!(
            "网格缓存版本不一致: 文件 {}, 当前 {}，继续按当前格式读取",
            version,
            CACHE_VERSION
        );
    }

    let name = read_string(reader)?;

    let count = read_len(reader)?;
    let mut materials = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        materials.push(read_material(reader)?);
    }

    let count = read_len(reader)?;
    let mut vertices = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        vertices.push(read_vertex(reader)?);
    }

    let count = read_len(reader)?;
    let mut indices = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        indices.push(reader.read_u32::<LittleEndian>()?);
    }

    let count = read_len(reader)?;
    let mut subsets = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let begin_index = reader.read_u32::<LittleEndian>()?;
        let index_count = reader.read_u32::<LittleEndian>()?;
        let material_index = reader.read_u32::<LittleEndian>()?;
        subsets.push(SubMesh::new(begin_index, index_count, material_index));
    }

    let skeleton = read_skeleton(reader)?;

    let count = read_len(reader)?;
    let mut clips = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        clips.push(Arc::new(read_clip(reader)?));
    }

    let has_animation_data = reader.read_u8()? != 0;
    if has_animation_data != !clips.is_empty() {
        log::warn!(
            "网格缓存 '{}': 动画标记为 {}，但包含 {} 个剪辑",
            name,
            has_animation_data,
            clips.len()
        );
    }

    let kind = if skeleton.is_empty() {
        if !clips.is_empty() {
            return Err(SkinError::Cache(format!(
                "mesh '{}' has {} clips but no skeleton",
                name,
                clips.len()
            )));
        }
        MeshKind::Static
    } else {
        MeshKind::Skeletal {
            skeleton: Arc::new(skeleton),
            clips,
        }
    };

    let mesh = MeshAsset {
        name,
        materials,
        vertices,
        indices,
        subsets,
        kind,
    };
    mesh.validate().map_err(|e| SkinError::Cache(e.to_string()))?;
    Ok(mesh)
}

/// 写入网格缓存文件
pub fn save_mesh_to_file(mesh: &MeshAsset, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    save_mesh(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// 读取网格缓存文件
pub fn load_mesh_from_file(path: impl AsRef<Path>) -> Result<MeshAsset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mesh = load_mesh(&mut reader)?;
    log::info!("加载网格缓存 '{}' ({})", mesh.name, path.display());
    Ok(mesh)
}

// ========== 骨架 ==========

fn write_skeleton<W: Write>(writer: &mut W, skeleton: &Skeleton) -> Result<()> {
    write_len(writer, skeleton.bone_count())?;
    for bone in skeleton.bones() {
        write_string(writer, &bone.name)?;
        writer.write_i32::<LittleEndian>(bone.parent_index)?;
        write_mat4(writer, &bone.inverse_bind_matrix)?;
        write_mat4(writer, &bone.local_bind_matrix)?;
    }

    // 名称映射按索引顺序写出，保证输出稳定
    let mut entries: Vec<(&String, &usize)> = skeleton.name_map().iter().collect();
    entries.sort_by_key(|(_, index)| **index);
    write_len(writer, entries.len())?;
    for (name, &index) in entries {
        write_string(writer, name)?;
        write_len(writer, index)?;
    }
    Ok(())
}

fn read_skeleton<R: Read>(reader: &mut R) -> Result<Skeleton> {
    let count = read_len(reader)?;
    let mut bones = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let mut bone = Bone::new(read_string(reader)?, reader.read_i32::<LittleEndian>()?);
        bone.inverse_bind_matrix = read_mat4(reader)?;
        bone.local_bind_matrix = read_mat4(reader)?;
        bones.push(bone);
    }
    let skeleton = Skeleton::from_bones(bones).map_err(|e| SkinError::Cache(e.to_string()))?;

    // 名称映射由骨骼数组重建，这里只做一致性检查
    let count = read_len(reader)?;
    if count != skeleton.bone_count() {
        return Err(SkinError::Cache(format!(
            "name map has {} entries for {} bones",
            count,
            skeleton.bone_count()
        )));
    }
    for _ in 0..count {
        let name = read_string(reader)?;
        let index = read_len(reader)?;
        if skeleton.find_bone(&name) != Some(index) {
            return Err(SkinError::Cache(format!(
                "name map entry '{}' -> {} does not match bone list",
                name, index
            )));
        }
    }
    Ok(skeleton)
}

// ========== 剪辑 ==========

fn write_clip<W: Write>(writer: &mut W, clip: &AnimationClip) -> Result<()> {
    write_string(writer, &clip.name)?;
    writer.write_u32::<LittleEndian>(clip.frame_rate.numerator)?;
    writer.write_u32::<LittleEndian>(clip.frame_rate.denominator)?;
    writer.write_f32::<LittleEndian>(clip.duration)?;
    writer.write_u32::<LittleEndian>(clip.number_of_frames)?;

    write_len(writer, clip.tracks().len())?;
    for (bone_index, track) in clip.tracks() {
        writer.write_i32::<LittleEndian>(*bone_index)?;

        write_len(writer, track.positions.len())?;
        for v in &track.positions {
            write_vec3(writer, *v)?;
        }
        write_len(writer, track.rotations.len())?;
        for q in &track.rotations {
            for c in q.to_array() {
                writer.write_f32::<LittleEndian>(c)?;
            }
        }
        write_len(writer, track.scales.len())?;
        for v in &track.scales {
            write_vec3(writer, *v)?;
        }
    }
    Ok(())
}

fn read_clip<R: Read>(reader: &mut R) -> Result<AnimationClip> {
    let name = read_string(reader)?;
    let numerator = reader.read_u32::<LittleEndian>()?;
    let denominator = reader.read_u32::<LittleEndian>()?;
    let duration = reader.read_f32::<LittleEndian>()?;
    let number_of_frames = reader.read_u32::<LittleEndian>()?;
    let mut clip = AnimationClip::new(name, FrameRate::new(numerator, denominator), duration, number_of_frames);

    let track_count = read_len(reader)?;
    for _ in 0..track_count {
        let bone_index = reader.read_i32::<LittleEndian>()?;

        let count = read_len(reader)?;
        let mut positions = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            positions.push(read_vec3(reader)?);
        }
        let count = read_len(reader)?;
        let mut rotations = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let x = reader.read_f32::<LittleEndian>()?;
            let y = reader.read_f32::<LittleEndian>()?;
            let z = reader.read_f32::<LittleEndian>()?;
            let w = reader.read_f32::<LittleEndian>()?;
            rotations.push(Quat::from_xyzw(x, y, z, w));
        }
        let count = read_len(reader)?;
        let mut scales = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            scales.push(read_vec3(reader)?);
        }

        clip.add_track(bone_index, KeyframeTrack::new(positions, rotations, scales))
            .map_err(|e| SkinError::Cache(e.to_string()))?;
    }
    Ok(clip)
}

// ========== 材质与顶点 ==========

fn write_material<W: Write>(writer: &mut W, material: &Material) -> Result<()> {
    write_string(writer, &material.name)?;
    for c in material.diffuse.to_array() {
        writer.write_f32::<LittleEndian>(c)?;
    }
    write_vec3(writer, material.specular)?;
    writer.write_f32::<LittleEndian>(material.shininess)?;
    write_vec3(writer, material.ambient)?;
    write_string(writer, &material.diffuse_texture)?;
    writer.write_u8(material.flags)?;
    Ok(())
}

fn read_material<R: Read>(reader: &mut R) -> Result<Material> {
    let name = read_string(reader)?;
    let mut diffuse = [0.0f32; 4];
    reader.read_f32_into::<LittleEndian>(&mut diffuse)?;
    Ok(Material {
        name,
        diffuse: Vec4::from_array(diffuse),
        specular: read_vec3(reader)?,
        shininess: reader.read_f32::<LittleEndian>()?,
        ambient: read_vec3(reader)?,
        diffuse_texture: read_string(reader)?,
        flags: reader.read_u8()?,
    })
}

fn write_vertex<W: Write>(writer: &mut W, vertex: &SkinnedVertex) -> Result<()> {
    write_vec3(writer, vertex.position)?;
    write_vec3(writer, vertex.normal)?;
    write_vec3(writer, vertex.tangent)?;
    writer.write_f32::<LittleEndian>(vertex.uv.x)?;
    writer.write_f32::<LittleEndian>(vertex.uv.y)?;
    for &bone in &vertex.bone_indices {
        writer.write_u32::<LittleEndian>(bone)?;
    }
    for &weight in &vertex.bone_weights {
        writer.write_f32::<LittleEndian>(weight)?;
    }
    Ok(())
}

fn read_vertex<R: Read>(reader: &mut R) -> Result<SkinnedVertex> {
    let position = read_vec3(reader)?;
    let normal = read_vec3(reader)?;
    let tangent = read_vec3(reader)?;
    let uv = Vec2::new(reader.read_f32::<LittleEndian>()?, reader.read_f32::<LittleEndian>()?);
    let mut vertex = SkinnedVertex::new(position, normal, tangent, uv);
    reader.read_u32_into::<LittleEndian>(&mut vertex.bone_indices)?;
    reader.read_f32_into::<LittleEndian>(&mut vertex.bone_weights)?;
    Ok(vertex)
}

// ========== 基础类型 ==========

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| SkinError::Cache(format!("length {} exceeds u32", len)))?;
    writer.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    Ok(reader.read_u32::<LittleEndian>()? as usize)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    write_len(writer, value.len())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_len(reader)?;
    let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(SkinError::Cache(format!(
            "string truncated: expected {} bytes, got {}",
            len,
            bytes.len()
        )));
    }
    String::from_utf8(bytes).map_err(|e| SkinError::Cache(format!("invalid UTF-8 string: {}", e)))
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vec3> {
    let mut v = [0.0f32; 3];
    reader.read_f32_into::<LittleEndian>(&mut v)?;
    Ok(Vec3::from_array(v))
}

fn write_mat4<W: Write>(writer: &mut W, m: &Mat4) -> Result<()> {
    for c in m.to_cols_array() {
        writer.write_f32::<LittleEndian>(c)?;
    }
    Ok(())
}

fn read_mat4<R: Read>(reader: &mut R) -> Result<Mat4> {
    let mut cols = [0.0f32; 16];
    reader.read_f32_into::<LittleEndian>(&mut cols)?;
    Ok(Mat4::from_cols_array(&cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::RawBone;
    use std::io::Cursor;

    fn sample_mesh() -> MeshAsset {
        let up = Mat4::from_translation(Vec3::Y);
        let skeleton = Skeleton::build_hierarchy(&[
            RawBone::new("root", None, Mat4::IDENTITY, Mat4::IDENTITY),
            RawBone::new("head", Some("root"), up, up),
        ]);

        let mut clip = AnimationClip::new("nod", FrameRate::new(30000, 1001), 0.5, 3);
        clip.add_track(
            1,
            KeyframeTrack::new(
                vec![Vec3::Y],
                vec![Quat::IDENTITY, Quat::from_rotation_x(0.2), Quat::from_rotation_x(0.4)],
                vec![],
            ),
        )
        .unwrap();

        let mut vertex = SkinnedVertex::new(Vec3::new(0.0, 1.5, 0.0), Vec3::Z, Vec3::X, Vec2::new(0.5, 1.0));
        vertex.bone_indices = [1, 0, 0, 0];
        vertex.bone_weights = [0.8, 0.2, 0.0, 0.0];
        let mut material = Material::new("face");
        material.diffuse_texture = "textures/face.png".into();

        MeshAsset {
            name: "head".into(),
            materials: vec![material],
            vertices: vec![vertex, SkinnedVertex::default(), SkinnedVertex::default()],
            indices: vec![0, 1, 2],
            subsets: vec![SubMesh::new(0, 3, 0)],
            kind: MeshKind::Skeletal {
                skeleton: Arc::new(skeleton),
                clips: vec![Arc::new(clip)],
            },
        }
    }

    fn encode(mesh: &MeshAsset) -> Vec<u8> {
        let mut bytes = Vec::new();
        save_mesh(mesh, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_round_trip_skeletal_mesh() {
        let mesh = sample_mesh();
        let loaded = load_mesh(&mut Cursor::new(encode(&mesh))).unwrap();
        assert_eq!(loaded, mesh);

        // 加载后的剪辑仍可采样
        let skeleton = loaded.skeleton().unwrap();
        let pose = loaded.find_clip("nod").unwrap().get_pose_at_time(0.0, skeleton, true);
        assert_eq!(pose.len(), 2);
        assert!(pose.get(1).unwrap().translation.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_round_trip_static_mesh() {
        let mut mesh = sample_mesh();
        mesh.kind = MeshKind::Static;
        mesh.vertices[0].bone_weights = [0.0; 4];
        let loaded = load_mesh(&mut Cursor::new(encode(&mesh))).unwrap();
        assert!(loaded.is_static());
        assert_eq!(loaded, mesh);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample_mesh());
        assert_eq!(&bytes[0..4], &CACHE_VERSION.to_le_bytes());
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
        assert_eq!(&bytes[8..12], b"head");
        // 末尾是动画标记
        assert_eq!(bytes.last(), Some(&1));
    }

    #[test]
    fn test_version_mismatch_still_loads() {
        let mut bytes = encode(&sample_mesh());
        bytes[0..4].copy_from_slice(&(CACHE_VERSION + 7).to_le_bytes());
        let loaded = load_mesh(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(loaded.name, "head");
    }

    #[test]
    fn test_truncated_data_fails() {
        let bytes = encode(&sample_mesh());
        for len in [0, 6, bytes.len() / 2, bytes.len() - 1] {
            assert!(load_mesh(&mut Cursor::new(&bytes[..len])).is_err(), "len = {}", len);
        }
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.mesh");
        let mesh = sample_mesh();
        save_mesh_to_file(&mesh, &path).unwrap();
        assert_eq!(load_mesh_from_file(&path).unwrap(), mesh);

        assert!(matches!(
            load_mesh_from_file(dir.path().join("missing.mesh")),
            Err(SkinError::Io(_))
        ));
    }
}
