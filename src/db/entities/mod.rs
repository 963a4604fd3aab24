pub mod monitor_check;
pub mod service_state_event;

pub mod prelude {
    pub use super::monitor_check::Entity as MonitorCheck;
    pub use super::monitor_check::Model as MonitorCheckModel;

    pub use super::service_state_event::Entity as ServiceStateEvent;
    pub use super::service_state_event::Model as ServiceStateEventModel;
}
