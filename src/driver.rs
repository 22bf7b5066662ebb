//! Driver Binding for the native motion-control library
//!
//! The vendor library exports a flat C interface (`robotInitialize`,
//! `robotMoveJoint`, ...). [`NativeDriver`] resolves those symbols at load
//! time; [`SimDriver`] stands in for the arm when no hardware is present.
//!
//! Entry points return the driver's raw results. Mapping those onto the
//! session's error taxonomy is the caller's job; this layer never retries.

use crate::{marshal, types::NUM_JOINTS, Result};
use libloading::Library;
use std::os::raw::{c_char, c_float, c_int};
use std::path::Path;
use tracing::info;

/// Typed view of the driver's call boundary.
///
/// Read calls return a view into a driver-owned buffer. The view borrows
/// the driver mutably, so it must be dropped (copied out through
/// [`marshal::decode`]) before any other call can be made. `None` means the
/// driver handed back no buffer.
pub trait Driver {
    fn initialize(&mut self, address: &[u8]) -> bool;
    fn move_joint(
        &mut self,
        angles: &[c_float; NUM_JOINTS],
        velocity: c_float,
        acceleration: c_float,
    ) -> c_int;
    fn move_end_effector(
        &mut self,
        pose: &[c_float; NUM_JOINTS],
        velocity: &[c_float; 2],
        acceleration: &[c_float; 2],
    ) -> c_int;
    fn read_joint(&mut self) -> Option<&[c_float]>;
    fn read_end_effector(&mut self) -> Option<&[c_float]>;
    fn read_joint_torque(&mut self) -> Option<&[c_float]>;
    fn gripper_control(&mut self, open: bool);
    fn wait(&mut self, seconds: c_int);
    fn quit_loop(&mut self) -> bool;
    fn disconnect(&mut self);
}

/// Move calls report success with any non-zero status
pub fn status_ok(status: c_int) -> bool {
    status != 0
}

macro_rules! forward_driver {
    ($target:ty) => {
        impl<D: Driver + ?Sized> Driver for $target {
            fn initialize(&mut self, address: &[u8]) -> bool {
                (**self).initialize(address)
            }
            fn move_joint(
                &mut self,
                angles: &[c_float; NUM_JOINTS],
                velocity: c_float,
                acceleration: c_float,
            ) -> c_int {
                (**self).move_joint(angles, velocity, acceleration)
            }
            fn move_end_effector(
                &mut self,
                pose: &[c_float; NUM_JOINTS],
                velocity: &[c_float; 2],
                acceleration: &[c_float; 2],
            ) -> c_int {
                (**self).move_end_effector(pose, velocity, acceleration)
            }
            fn read_joint(&mut self) -> Option<&[c_float]> {
                (**self).read_joint()
            }
            fn read_end_effector(&mut self) -> Option<&[c_float]> {
                (**self).read_end_effector()
            }
            fn read_joint_torque(&mut self) -> Option<&[c_float]> {
                (**self).read_joint_torque()
            }
            fn gripper_control(&mut self, open: bool) {
                (**self).gripper_control(open)
            }
            fn wait(&mut self, seconds: c_int) {
                (**self).wait(seconds)
            }
            fn quit_loop(&mut self) -> bool {
                (**self).quit_loop()
            }
            fn disconnect(&mut self) {
                (**self).disconnect()
            }
        }
    };
}

forward_driver!(Box<D>);
forward_driver!(&mut D);

type InitializeFn = unsafe extern "C" fn(*const c_char, c_int) -> bool;
type MoveJointFn = unsafe extern "C" fn(*const c_float, c_float, c_float) -> c_int;
type MoveEndEffectorFn =
    unsafe extern "C" fn(*const c_float, *const c_float, *const c_float) -> c_int;
type ReadFn = unsafe extern "C" fn() -> *const c_float;
type GripperFn = unsafe extern "C" fn(bool);
type WaitFn = unsafe extern "C" fn(c_int);
type QuitLoopFn = unsafe extern "C" fn() -> bool;
type DisconnectFn = unsafe extern "C" fn();

/// Driver backed by the vendor's shared library
pub struct NativeDriver {
    initialize: InitializeFn,
    move_joint: MoveJointFn,
    move_end_effector: MoveEndEffectorFn,
    read_joint: ReadFn,
    read_end_effector: ReadFn,
    read_joint_torque: ReadFn,
    gripper_control: GripperFn,
    wait: WaitFn,
    quit_loop: QuitLoopFn,
    disconnect: DisconnectFn,
    // Function pointers above are only valid while the library stays loaded
    _library: Library,
}

impl NativeDriver {
    /// Load the driver library and resolve every entry point
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading motion driver from {}", path.display());

        unsafe {
            let library = Library::new(path)?;
            let initialize = *library.get::<InitializeFn>(b"robotInitialize\0")?;
            let move_joint = *library.get::<MoveJointFn>(b"robotMoveJoint\0")?;
            let move_end_effector = *library.get::<MoveEndEffectorFn>(b"robotMoveEndEffector\0")?;
            let read_joint = *library.get::<ReadFn>(b"robotReadJoint\0")?;
            let read_end_effector = *library.get::<ReadFn>(b"robotReadEndEffector\0")?;
            let read_joint_torque = *library.get::<ReadFn>(b"robotReadJointTorque\0")?;
            let gripper_control = *library.get::<GripperFn>(b"robotGripperControl\0")?;
            let wait = *library.get::<WaitFn>(b"robotWait\0")?;
            let quit_loop = *library.get::<QuitLoopFn>(b"robotQuitLoop\0")?;
            let disconnect = *library.get::<DisconnectFn>(b"robotDisconnect\0")?;
            info!("Motion driver entry points resolved");

            Ok(Self {
                initialize,
                move_joint,
                move_end_effector,
                read_joint,
                read_end_effector,
                read_joint_torque,
                gripper_control,
                wait,
                quit_loop,
                disconnect,
                _library: library,
            })
        }
    }

    fn view<'a>(ptr: *const c_float) -> Option<&'a [c_float]> {
        if ptr.is_null() {
            None
        } else {
            // The driver guarantees NUM_JOINTS floats behind every read pointer
            Some(unsafe { std::slice::from_raw_parts(ptr, NUM_JOINTS) })
        }
    }
}

impl Driver for NativeDriver {
    fn initialize(&mut self, address: &[u8]) -> bool {
        let len = match marshal::encode(marshal::Value::Int(address.len() as i64)) {
            Ok(marshal::Encoded::Int(len)) => len,
            _ => return false,
        };
        unsafe { (self.initialize)(address.as_ptr() as *const c_char, len) }
    }

    fn move_joint(
        &mut self,
        angles: &[c_float; NUM_JOINTS],
        velocity: c_float,
        acceleration: c_float,
    ) -> c_int {
        unsafe { (self.move_joint)(angles.as_ptr(), velocity, acceleration) }
    }

    fn move_end_effector(
        &mut self,
        pose: &[c_float; NUM_JOINTS],
        velocity: &[c_float; 2],
        acceleration: &[c_float; 2],
    ) -> c_int {
        unsafe { (self.move_end_effector)(pose.as_ptr(), velocity.as_ptr(), acceleration.as_ptr()) }
    }

    fn read_joint(&mut self) -> Option<&[c_float]> {
        Self::view(unsafe { (self.read_joint)() })
    }

    fn read_end_effector(&mut self) -> Option<&[c_float]> {
        Self::view(unsafe { (self.read_end_effector)() })
    }

    fn read_joint_torque(&mut self) -> Option<&[c_float]> {
        Self::view(unsafe { (self.read_joint_torque)() })
    }

    fn gripper_control(&mut self, open: bool) {
        unsafe { (self.gripper_control)(open) }
    }

    fn wait(&mut self, seconds: c_int) {
        unsafe { (self.wait)(seconds) }
    }

    fn quit_loop(&mut self) -> bool {
        unsafe { (self.quit_loop)() }
    }

    fn disconnect(&mut self) {
        unsafe { (self.disconnect)() }
    }
}

/// One call observed by [`SimDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Initialize(String),
    MoveJoint {
        angles: [c_float; NUM_JOINTS],
        velocity: c_float,
        acceleration: c_float,
    },
    MoveEndEffector {
        pose: [c_float; NUM_JOINTS],
        velocity: [c_float; 2],
        acceleration: [c_float; 2],
    },
    ReadJoint,
    ReadEndEffector,
    ReadJointTorque,
    GripperControl(bool),
    Wait(c_int),
    QuitLoop,
    Disconnect,
}

/// In-process driver that tracks commanded targets instead of moving an arm.
///
/// Every call is appended to [`SimDriver::calls`]. Joint and line moves
/// update the simulated joint/pose readings; torque readings stay at
/// whatever was configured. Reads reuse a single output buffer the same
/// way the native driver does.
#[derive(Debug, Clone)]
pub struct SimDriver {
    pub calls: Vec<DriverCall>,
    pub accept_connection: bool,
    pub move_status: c_int,
    pub joints: Vec<c_float>,
    pub pose: Vec<c_float>,
    pub torques: Vec<c_float>,
    buffer: Vec<c_float>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            accept_connection: true,
            move_status: 1,
            joints: vec![0.0; NUM_JOINTS],
            pose: vec![0.0; NUM_JOINTS],
            torques: vec![0.0; NUM_JOINTS],
            buffer: Vec::with_capacity(NUM_JOINTS),
        }
    }
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_torques(mut self, torques: &[c_float]) -> Self {
        self.torques = torques.to_vec();
        self
    }

    pub fn with_move_status(mut self, status: c_int) -> Self {
        self.move_status = status;
        self
    }

    pub fn refusing_connection(mut self) -> Self {
        self.accept_connection = false;
        self
    }

    /// Number of recorded calls matching a predicate
    pub fn count(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    fn fill(&mut self, source: Reading) -> Option<&[c_float]> {
        let values = match source {
            Reading::Joint => &self.joints,
            Reading::Pose => &self.pose,
            Reading::Torque => &self.torques,
        };
        self.buffer.clear();
        self.buffer.extend_from_slice(values);
        Some(&self.buffer)
    }
}

#[derive(Clone, Copy)]
enum Reading {
    Joint,
    Pose,
    Torque,
}

impl Driver for SimDriver {
    fn initialize(&mut self, address: &[u8]) -> bool {
        self.calls
            .push(DriverCall::Initialize(String::from_utf8_lossy(address).into_owned()));
        self.accept_connection
    }

    fn move_joint(
        &mut self,
        angles: &[c_float; NUM_JOINTS],
        velocity: c_float,
        acceleration: c_float,
    ) -> c_int {
        self.calls.push(DriverCall::MoveJoint {
            angles: *angles,
            velocity,
            acceleration,
        });
        if status_ok(self.move_status) {
            self.joints = angles.to_vec();
        }
        self.move_status
    }

    fn move_end_effector(
        &mut self,
        pose: &[c_float; NUM_JOINTS],
        velocity: &[c_float; 2],
        acceleration: &[c_float; 2],
    ) -> c_int {
        self.calls.push(DriverCall::MoveEndEffector {
            pose: *pose,
            velocity: *velocity,
            acceleration: *acceleration,
        });
        if status_ok(self.move_status) {
            self.pose = pose.to_vec();
        }
        self.move_status
    }

    fn read_joint(&mut self) -> Option<&[c_float]> {
        self.calls.push(DriverCall::ReadJoint);
        self.fill(Reading::Joint)
    }

    fn read_end_effector(&mut self) -> Option<&[c_float]> {
        self.calls.push(DriverCall::ReadEndEffector);
        self.fill(Reading::Pose)
    }

    fn read_joint_torque(&mut self) -> Option<&[c_float]> {
        self.calls.push(DriverCall::ReadJointTorque);
        self.fill(Reading::Torque)
    }

    fn gripper_control(&mut self, open: bool) {
        self.calls.push(DriverCall::GripperControl(open));
    }

    fn wait(&mut self, seconds: c_int) {
        self.calls.push(DriverCall::Wait(seconds));
    }

    fn quit_loop(&mut self) -> bool {
        self.calls.push(DriverCall::QuitLoop);
        false
    }

    fn disconnect(&mut self) {
        self.calls.push(DriverCall::Disconnect);
    }
}
