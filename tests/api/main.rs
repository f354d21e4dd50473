mod checkout;
mod health_check;
mod order_status;
mod promo_codes;
mod test_utils;
