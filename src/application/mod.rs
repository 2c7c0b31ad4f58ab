pub mod bootstrap;
pub mod itinerary_service;
