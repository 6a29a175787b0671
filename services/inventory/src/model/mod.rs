mod product;
mod staging;
mod stock_balance;

pub use product::{NameXModel, ProductBarcodeModel};
pub use staging::{
    PaginationModel, StagingRowCreateModel, StagingRowEditModel, StagingRowFilterModel,
    StagingRowModel, StagingTaskMetaModel,
};
pub use stock_balance::{
    OutboxEventModel, StockBalanceDetailModel, StockBalanceHeaderModel,
    StockBalanceMessageModel, TransactionDetailModel,
};
