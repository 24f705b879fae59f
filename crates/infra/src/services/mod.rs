mod geocoder;
mod notifier;

pub use geocoder::{GeocodeError, GoogleMapsGeocoder, IGeocoder, InMemoryGeocoder};
pub use notifier::{HttpRelayNotifier, INotifier, LogNotifier, NotifyError};
