use crate::uuid_id;

uuid_id!(CustomerId);
uuid_id!(OrderId);
uuid_id!(OrderLineId);
uuid_id!(ProductId);
uuid_id!(PromoCodeId);
uuid_id!(RestaurantId);
