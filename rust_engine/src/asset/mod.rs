//! 资源导入、注册与缓存

mod cache;
mod import;
mod registry;

pub use cache::{load_mesh, load_mesh_from_file, save_mesh, save_mesh_to_file, CACHE_VERSION};
pub use import::{build_mesh_asset, MeshImporter, RawAnimationStack, RawMeshData, RawVertex};
pub use registry::AssetRegistry;

/// 资源句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    pub fn raw(self) -> u64 {
        self.0
    }
}
