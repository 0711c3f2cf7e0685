// 公开导出的模块，供外部使用
pub mod models;
pub mod data_provider;
pub mod errors;

// 为了支持主程序和集成测试，这些模块保持公开
// 但在库使用场景中，它们属于内部实现
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod logging;
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use models::company::ConstituentRecord;
pub use models::price::{PriceHistory, PricePoint};
pub use models::table::Table;
pub use data_provider::PriceDataProvider;
pub use errors::{Result, EtlError};
