/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod conf;
pub mod gate {
    //! Run-or-skip decisions for scheduled tasks.

    mod cron_gate;
    mod gate_decision;

    pub use self::cron_gate::CronGate;
    pub use self::cron_gate::min_delay_elapsed;
    pub use self::gate_decision::GateDecision;
    pub use self::gate_decision::SkipReason;
}
pub mod lock {
    //! Named locks on top of a shared cache.

    mod lock_store;
    mod ownership_token;

    pub use self::lock_store::LockStore;
    pub use self::ownership_token::OwnershipToken;
}
#[cfg(test)]
mod test_support;

pub use self::conf::AppConfig;
pub use self::gate::CronGate;
pub use self::gate::GateDecision;
pub use cronmutex_cache::client::ServerEndpoint;
