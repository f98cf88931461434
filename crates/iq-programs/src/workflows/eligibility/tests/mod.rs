
use crate::workflows::address::{AddressHash, AddressId, AddressRecord};

pub(super) fn address(in_service_area: bool, city_covered: bool, broadband: bool) -> AddressRecord {
    AddressRecord {
        id: AddressId(1),
        address1: "123 MAIN ST".to_string(),
        address2: String::new(),
        city: "FORT COLLINS".to_string(),
        state: "CO".to_string(),
        zip_code: "80521".to_string(),
        hash: AddressHash("test".to_string()),
        is_in_service_area: in_service_area,
        is_city_covered: city_covered,
        has_broadband_service: broadband,
        is_verified: true,
    }
}
