use crate::WebApiHdlrLabel;

pub mod app_meta {
    pub const LABEL: &str = "inventory";
    // TODO, machine code to UUID generator should be configurable
    pub const MACHINE_CODE: u8 = 3;
}

pub mod hard_limit {
    pub const MAX_ITEMS_STORED_PER_MODEL: u32 = 65536u32;
    pub const MAX_DB_CONNECTIONS: u32 = 10000u32;
    pub const MAX_SECONDS_DB_IDLE: u16 = 600u16;
    // barcodes resolved against product master in one round trip
    pub const MAX_IMPORT_CHUNK: usize = 5000;
    pub const MAX_ROWS_PER_IMPORT: usize = 50000;
    pub const MAX_ROWS_PER_PAGE: u32 = 200;
    pub const MAX_BYTES_UPLOAD_FILE: usize = 8 << 20;
}

pub(crate) mod api {
    use super::WebApiHdlrLabel;

    #[allow(non_camel_case_types)]
    pub(crate) struct web {}

    impl web {
        pub(crate) const IMPORT_UPLOAD: WebApiHdlrLabel = "import_upload";
        pub(crate) const IMPORT_CREATE_ROW: WebApiHdlrLabel = "import_create_row";
        pub(crate) const IMPORT_LIST_ROWS: WebApiHdlrLabel = "import_list_rows";
        pub(crate) const IMPORT_TASK_COMMIT: WebApiHdlrLabel = "import_task_commit";
        pub(crate) const IMPORT_TASK_DELETE: WebApiHdlrLabel = "import_task_delete";
        pub(crate) const IMPORT_UPDATE_ROW: WebApiHdlrLabel = "import_update_row";
        pub(crate) const IMPORT_DELETE_ROW: WebApiHdlrLabel = "import_delete_row";
        pub(crate) const IMPORT_TASK_META: WebApiHdlrLabel = "import_task_meta";
        pub(crate) const IMPORT_TASK_VERIFY: WebApiHdlrLabel = "import_task_verify";
    }
}

/// column labels expected in the header row of uploaded worksheet
pub mod import_column {
    pub const BARCODE: &str = "Barcode";
    pub const NAME: &str = "Name";
    pub const UNIT_CODE: &str = "Unit Code";
    pub const WAREHOUSE_CODE: &str = "Warehouse Code";
    pub const SHELF_CODE: &str = "Shelf Code";
    pub const QTY: &str = "Qty";
    pub const AMOUNT: &str = "Amount";
    pub const REQUIRED: [&str; 7] = [
        BARCODE,
        NAME,
        UNIT_CODE,
        WAREHOUSE_CODE,
        SHELF_CODE,
        QTY,
        AMOUNT,
    ];
}

pub const UPLOAD_FILE_EXTENSION: &str = ".xlsx";
pub const DOC_NO_PREFIX: &str = "SB";
pub(crate) const HTTP_CONTENT_TYPE_JSON: &str = "application/json";
// routing label of the event emitted after a stock-balance document is created
pub const EVENT_ROUTE_STOCK_BALANCE_CREATED: &str = "inventory.stock_balance.created";
