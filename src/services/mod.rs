pub(crate) mod mpesa_service;
