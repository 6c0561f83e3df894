//! Index-build and query-time parameter families.
//!
//! Both families are closed: every consumer matches on the enum, so adding a
//! variant is a compile error at each dispatch point rather than a runtime
//! surprise. `Clone` yields a fully independent copy of the active variant.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{IndexType, MetricType, QuantizeType};

pub const DEFAULT_HNSW_M: u32 = 50;
pub const DEFAULT_HNSW_EF_CONSTRUCTION: u32 = 500;
pub const DEFAULT_IVF_N_LIST: u32 = 1024;
pub const DEFAULT_IVF_N_ITERS: u32 = 10;
pub const DEFAULT_HNSW_EF: u32 = 300;
pub const DEFAULT_IVF_NPROBE: u32 = 10;
pub const DEFAULT_SCALE_FACTOR: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswIndexParams {
    pub metric_type: MetricType,
    pub m: u32,
    pub ef_construction: u32,
    pub quantize_type: QuantizeType,
}

impl HnswIndexParams {
    pub fn new(metric_type: MetricType) -> Self {
        Self {
            metric_type,
            m: DEFAULT_HNSW_M,
            ef_construction: DEFAULT_HNSW_EF_CONSTRUCTION,
            quantize_type: QuantizeType::Undefined,
        }
    }

    #[must_use]
    pub fn with_m(mut self, m: u32) -> Self {
        self.m = m;
        self
    }

    #[must_use]
    pub fn with_ef_construction(mut self, ef_construction: u32) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    #[must_use]
    pub fn with_quantize_type(mut self, quantize_type: QuantizeType) -> Self {
        self.quantize_type = quantize_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndexParams {
    pub metric_type: MetricType,
    pub quantize_type: QuantizeType,
}

impl FlatIndexParams {
    pub fn new(metric_type: MetricType) -> Self {
        Self {
            metric_type,
            quantize_type: QuantizeType::Undefined,
        }
    }

    #[must_use]
    pub fn with_quantize_type(mut self, quantize_type: QuantizeType) -> Self {
        self.quantize_type = quantize_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvfIndexParams {
    pub metric_type: MetricType,
    pub n_list: u32,
    pub n_iters: u32,
    pub use_soar: bool,
    pub quantize_type: QuantizeType,
}

impl IvfIndexParams {
    pub fn new(metric_type: MetricType) -> Self {
        Self {
            metric_type,
            n_list: DEFAULT_IVF_N_LIST,
            n_iters: DEFAULT_IVF_N_ITERS,
            use_soar: false,
            quantize_type: QuantizeType::Undefined,
        }
    }

    #[must_use]
    pub fn with_n_list(mut self, n_list: u32) -> Self {
        self.n_list = n_list;
        self
    }

    #[must_use]
    pub fn with_n_iters(mut self, n_iters: u32) -> Self {
        self.n_iters = n_iters;
        self
    }

    #[must_use]
    pub fn with_soar(mut self, use_soar: bool) -> Self {
        self.use_soar = use_soar;
        self
    }

    #[must_use]
    pub fn with_quantize_type(mut self, quantize_type: QuantizeType) -> Self {
        self.quantize_type = quantize_type;
        self
    }
}

/// Scalar (inverted) index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertIndexParams {
    pub enable_range_optimization: bool,
    pub enable_extended_wildcard: bool,
}

impl Default for InvertIndexParams {
    fn default() -> Self {
        Self {
            enable_range_optimization: true,
            enable_extended_wildcard: false,
        }
    }
}

impl InvertIndexParams {
    pub fn new(enable_range_optimization: bool, enable_extended_wildcard: bool) -> Self {
        Self {
            enable_range_optimization,
            enable_extended_wildcard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexParams {
    Hnsw(HnswIndexParams),
    Flat(FlatIndexParams),
    Ivf(IvfIndexParams),
    Invert(InvertIndexParams),
}

impl IndexParams {
    pub fn hnsw(metric_type: MetricType) -> Self {
        IndexParams::Hnsw(HnswIndexParams::new(metric_type))
    }

    pub fn flat(metric_type: MetricType) -> Self {
        IndexParams::Flat(FlatIndexParams::new(metric_type))
    }

    pub fn ivf(metric_type: MetricType) -> Self {
        IndexParams::Ivf(IvfIndexParams::new(metric_type))
    }

    pub fn invert() -> Self {
        IndexParams::Invert(InvertIndexParams::default())
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexParams::Hnsw(_) => IndexType::Hnsw,
            IndexParams::Flat(_) => IndexType::Flat,
            IndexParams::Ivf(_) => IndexType::Ivf,
            IndexParams::Invert(_) => IndexType::Invert,
        }
    }

    #[inline]
    pub fn is_vector_index(&self) -> bool {
        self.index_type().is_vector_index()
    }

    pub fn metric_type(&self) -> Option<MetricType> {
        match self {
            IndexParams::Hnsw(p) => Some(p.metric_type),
            IndexParams::Flat(p) => Some(p.metric_type),
            IndexParams::Ivf(p) => Some(p.metric_type),
            IndexParams::Invert(_) => None,
        }
    }

    pub fn quantize_type(&self) -> Option<QuantizeType> {
        match self {
            IndexParams::Hnsw(p) => Some(p.quantize_type),
            IndexParams::Flat(p) => Some(p.quantize_type),
            IndexParams::Ivf(p) => Some(p.quantize_type),
            IndexParams::Invert(_) => None,
        }
    }

    /// Returns false (and changes nothing) for scalar index params.
    pub fn set_metric_type(&mut self, metric_type: MetricType) -> bool {
        match self {
            IndexParams::Hnsw(p) => p.metric_type = metric_type,
            IndexParams::Flat(p) => p.metric_type = metric_type,
            IndexParams::Ivf(p) => p.metric_type = metric_type,
            IndexParams::Invert(_) => return false,
        }
        true
    }

    /// Returns false (and changes nothing) for scalar index params.
    pub fn set_quantize_type(&mut self, quantize_type: QuantizeType) -> bool {
        match self {
            IndexParams::Hnsw(p) => p.quantize_type = quantize_type,
            IndexParams::Flat(p) => p.quantize_type = quantize_type,
            IndexParams::Ivf(p) => p.quantize_type = quantize_type,
            IndexParams::Invert(_) => return false,
        }
        true
    }
}

impl fmt::Display for IndexParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexParams::Hnsw(p) => write!(
                f,
                "HnswIndexParams{{metric={}, m={}, ef_construction={}, quantize={}}}",
                p.metric_type, p.m, p.ef_construction, p.quantize_type
            ),
            IndexParams::Flat(p) => write!(
                f,
                "FlatIndexParams{{metric={}, quantize={}}}",
                p.metric_type, p.quantize_type
            ),
            IndexParams::Ivf(p) => write!(
                f,
                "IVFIndexParams{{metric={}, n_list={}, n_iters={}, use_soar={}, quantize={}}}",
                p.metric_type, p.n_list, p.n_iters, p.use_soar, p.quantize_type
            ),
            IndexParams::Invert(p) => write!(
                f,
                "InvertIndexParams{{range_optimization={}, extended_wildcard={}}}",
                p.enable_range_optimization, p.enable_extended_wildcard
            ),
        }
    }
}

impl From<HnswIndexParams> for IndexParams {
    fn from(p: HnswIndexParams) -> Self {
        IndexParams::Hnsw(p)
    }
}

impl From<FlatIndexParams> for IndexParams {
    fn from(p: FlatIndexParams) -> Self {
        IndexParams::Flat(p)
    }
}

impl From<IvfIndexParams> for IndexParams {
    fn from(p: IvfIndexParams) -> Self {
        IndexParams::Ivf(p)
    }
}

impl From<InvertIndexParams> for IndexParams {
    fn from(p: InvertIndexParams) -> Self {
        IndexParams::Invert(p)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswQueryParams {
    pub ef: u32,
    pub radius: f32,
    pub is_linear: bool,
    pub is_using_refiner: bool,
}

impl Default for HnswQueryParams {
    fn default() -> Self {
        Self {
            ef: DEFAULT_HNSW_EF,
            radius: 0.0,
            is_linear: false,
            is_using_refiner: false,
        }
    }
}

impl HnswQueryParams {
    pub fn new(ef: u32) -> Self {
        Self {
            ef,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvfQueryParams {
    pub nprobe: u32,
    pub scale_factor: f32,
    pub radius: f32,
    pub is_linear: bool,
    pub is_using_refiner: bool,
}

impl Default for IvfQueryParams {
    fn default() -> Self {
        Self {
            nprobe: DEFAULT_IVF_NPROBE,
            scale_factor: DEFAULT_SCALE_FACTOR,
            radius: 0.0,
            is_linear: false,
            is_using_refiner: false,
        }
    }
}

impl IvfQueryParams {
    pub fn new(nprobe: u32) -> Self {
        Self {
            nprobe,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatQueryParams {
    pub scale_factor: f32,
    pub radius: f32,
    pub is_linear: bool,
    pub is_using_refiner: bool,
}

impl Default for FlatQueryParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            radius: 0.0,
            is_linear: false,
            is_using_refiner: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryParams {
    Hnsw(HnswQueryParams),
    Ivf(IvfQueryParams),
    Flat(FlatQueryParams),
}

impl QueryParams {
    pub fn index_type(&self) -> IndexType {
        match self {
            QueryParams::Hnsw(_) => IndexType::Hnsw,
            QueryParams::Ivf(_) => IndexType::Ivf,
            QueryParams::Flat(_) => IndexType::Flat,
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            QueryParams::Hnsw(p) => p.radius,
            QueryParams::Ivf(p) => p.radius,
            QueryParams::Flat(p) => p.radius,
        }
    }

    pub fn set_radius(&mut self, radius: f32) {
        match self {
            QueryParams::Hnsw(p) => p.radius = radius,
            QueryParams::Ivf(p) => p.radius = radius,
            QueryParams::Flat(p) => p.radius = radius,
        }
    }

    pub fn is_linear(&self) -> bool {
        match self {
            QueryParams::Hnsw(p) => p.is_linear,
            QueryParams::Ivf(p) => p.is_linear,
            QueryParams::Flat(p) => p.is_linear,
        }
    }

    pub fn set_linear(&mut self, is_linear: bool) {
        match self {
            QueryParams::Hnsw(p) => p.is_linear = is_linear,
            QueryParams::Ivf(p) => p.is_linear = is_linear,
            QueryParams::Flat(p) => p.is_linear = is_linear,
        }
    }

    pub fn is_using_refiner(&self) -> bool {
        match self {
            QueryParams::Hnsw(p) => p.is_using_refiner,
            QueryParams::Ivf(p) => p.is_using_refiner,
            QueryParams::Flat(p) => p.is_using_refiner,
        }
    }

    pub fn set_using_refiner(&mut self, is_using_refiner: bool) {
        match self {
            QueryParams::Hnsw(p) => p.is_using_refiner = is_using_refiner,
            QueryParams::Ivf(p) => p.is_using_refiner = is_using_refiner,
            QueryParams::Flat(p) => p.is_using_refiner = is_using_refiner,
        }
    }
}

impl From<HnswQueryParams> for QueryParams {
    fn from(p: HnswQueryParams) -> Self {
        QueryParams::Hnsw(p)
    }
}

impl From<IvfQueryParams> for QueryParams {
    fn from(p: IvfQueryParams) -> Self {
        QueryParams::Ivf(p)
    }
}

impl From<FlatQueryParams> for QueryParams {
    fn from(p: FlatQueryParams) -> Self {
        QueryParams::Flat(p)
    }
}
