pub mod itinerary;
pub mod request;
pub mod response;
pub mod result;

pub use itinerary::{Activity, ActivityCategory, DayPlan, ItinerarySpec};
pub use request::{
    Budget, ChatRequest, ConversationTurn, FormRequest, GenerationMode, GenerationRequest, Role,
    SurpriseRequest,
};
pub use response::deserialize_payload;
pub use result::GenerationResult;
