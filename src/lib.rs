// Two-track (skid-steer) drive runtime
//
// motor    - kinematics, actuator backends, drive controller
// dispatch - action names -> controller calls, behind one lock
// runtime  - zenoh transport around the dispatcher
// demo     - motion self-test sequence

pub mod config;
pub mod demo;
pub mod dispatch;
pub mod messages;
pub mod motor;
pub mod runtime;
