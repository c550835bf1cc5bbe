pub mod m202501150001_create_realtime_documents;
