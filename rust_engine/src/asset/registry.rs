//! 资源注册表
//!
//! 由调用方持有并按引用传递，不存在全局实例。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SkinningConfig;
use crate::model::MeshAsset;
use crate::{Result, SkinError};

use super::{build_mesh_asset, load_mesh_from_file, save_mesh_to_file, AssetId, MeshImporter};

/// 网格资源注册表
#[derive(Debug)]
pub struct AssetRegistry {
    meshes: HashMap<AssetId, Arc<MeshAsset>>,
    /// 来源路径 -> 句柄，重复导入同一路径时直接返回已有资源
    paths: HashMap<PathBuf, AssetId>,
    next_id: u64,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            meshes: HashMap::new(),
            paths: HashMap::new(),
            next_id: 1,
        }
    }

    /// 注册已构建好的网格
    pub fn insert(&mut self, mesh: MeshAsset) -> AssetId {
        let id = AssetId(self.next_id);
        self.next_id += 1;
        self.meshes.insert(id, Arc::new(mesh));
        id
    }

    pub fn get(&self, id: AssetId) -> Option<Arc<MeshAsset>> {
        self.meshes.get(&id).cloned()
    }

    /// 移除资源；已创建的组件仍持有自己的 Arc
    pub fn remove(&mut self, id: AssetId) -> Option<Arc<MeshAsset>> {
        self.paths.retain(|_, v| *v != id);
        self.meshes.remove(&id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<AssetId> {
        self.paths.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// 通过导入器加载网格并注册
    ///
    /// 失败时记录错误并返回，不会注册任何资源。
    pub fn import_mesh<I: MeshImporter + ?Sized>(
        &mut self,
        importer: &mut I,
        path: impl AsRef<Path>,
        config: &SkinningConfig,
    ) -> Result<AssetId> {
        let path = path.as_ref();
        if let Some(id) = self.find_by_path(path) {
            log::debug!("网格已加载: {} -> {:?}", path.display(), id);
            return Ok(id);
        }

        let mesh = importer
            .import(path)
            .and_then(|raw| build_mesh_asset(raw, config))
            .map_err(|e| {
                log::error!("导入网格失败 {}: {}", path.display(), e);
                e
            })?;

        log::info!(
            "导入网格 '{}': {} 顶点, {} 索引, {} 骨骼, {} 动画",
            mesh.name,
            mesh.vertex_count(),
            mesh.index_count(),
            mesh.skeleton().map_or(0, |s| s.bone_count()),
            mesh.clips().len()
        );

        let id = self.insert(mesh);
        self.paths.insert(path.to_path_buf(), id);
        Ok(id)
    }

    /// 从二进制缓存加载网格并注册
    pub fn load_cached_mesh(&mut self, path: impl AsRef<Path>) -> Result<AssetId> {
        let path = path.as_ref();
        let mesh = load_mesh_from_file(path).map_err(|e| {
            log::error!("加载网格缓存失败 {}: {}", path.display(), e);
            e
        })?;
        Ok(self.insert(mesh))
    }

    /// 把已注册的网格写入二进制缓存
    pub fn save_cached_mesh(&self, id: AssetId, path: impl AsRef<Path>) -> Result<()> {
        let mesh = self
            .meshes
            .get(&id)
            .ok_or_else(|| SkinError::Cache(format!("unknown asset {:?}", id)))?;
        save_mesh_to_file(mesh, path)
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
