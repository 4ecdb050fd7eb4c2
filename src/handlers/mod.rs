pub(crate) mod callback_handlers;
pub(crate) mod mpesa_handlers;
