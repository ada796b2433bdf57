//! In-memory hosts that interpret the commands trellis sends
//!
//! Each fake host tracks just enough state to check post-conditions: files in
//! the working directory, network interfaces, the kubeconfig directory, CNI
//! state, kubelet, and cluster membership.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trellis_bootstrap::credentials::CREDENTIALS_COMMAND;
use trellis_bootstrap::join::TOKEN_CREATE_COMMAND;
use trellis_bootstrap::reset::LIST_WORKDIR_COMMAND;
use trellis_bootstrap::{BootstrapContext, ConsoleOutput, Machine, RemoteExecutor};
use trellis_common::TransportError;

/// Observable state of one machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostState {
    pub files: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub kubeconfig: bool,
    pub cni_state: bool,
    pub kubelet_running: bool,
    pub tooling_installed: bool,
    pub initialized: bool,
    pub joined: bool,
}

impl HostState {
    /// A machine left behind by a previous, half-finished attempt
    pub fn dirty() -> Self {
        Self {
            files: ["init.sh", "flannel.yaml"].into_iter().map(String::from).collect(),
            links: ["cni0", "flannel.1"].into_iter().map(String::from).collect(),
            kubeconfig: true,
            cni_state: true,
            kubelet_running: true,
            tooling_installed: true,
            initialized: true,
            joined: false,
        }
    }
}

fn exit(status: i32, stderr: &str) -> TransportError {
    TransportError::NonZeroExit {
        status,
        stderr: stderr.to_string(),
    }
}

/// A set of fake hosts keyed by ip
#[derive(Default)]
pub struct FakeFleet {
    hosts: Mutex<HashMap<String, HostState>>,
    log: Mutex<Vec<(String, String)>>,
    unreachable: Mutex<BTreeSet<String>>,
}

impl FakeFleet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_host(self: Arc<Self>, ip: &str, state: HostState) -> Arc<Self> {
        self.hosts.lock().unwrap().insert(ip.to_string(), state);
        self
    }

    pub fn make_unreachable(&self, ip: &str) {
        self.unreachable.lock().unwrap().insert(ip.to_string());
    }

    pub fn state(&self, ip: &str) -> HostState {
        self.hosts.lock().unwrap().get(ip).cloned().unwrap_or_default()
    }

    /// Every command run, as (ip, command)
    pub fn commands(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }

    pub fn commands_on(&self, ip: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|(host, _)| host == ip)
            .map(|(_, cmd)| cmd)
            .collect()
    }

    pub fn context(self: &Arc<Self>) -> BootstrapContext {
        BootstrapContext::new(self.clone()).expect("context builds")
    }

    fn execute(&self, ip: &str, cmd: &str) -> Result<String, TransportError> {
        let mut hosts = self.hosts.lock().unwrap();
        let host = hosts.entry(ip.to_string()).or_default();

        if cmd == LIST_WORKDIR_COMMAND {
            let mut entries: Vec<String> = host.files.iter().cloned().collect();
            if host.kubeconfig {
                entries.push(".kube".to_string());
            }
            return Ok(entries.join("\n"));
        }
        if let Some(script) = cmd.strip_prefix("sh ") {
            if !host.files.contains(script) {
                return Err(exit(127, &format!("sh: {}: No such file", script)));
            }
            host.tooling_installed = true;
            return Ok(String::new());
        }
        if cmd == "echo y | kubeadm reset" {
            if !host.tooling_installed {
                return Err(exit(127, "kubeadm: command not found"));
            }
            host.initialized = false;
            host.joined = false;
            return Ok("[reset] Deleted contents of the etcd data directory".to_string());
        }
        if cmd == "rm -rf $HOME/.kube" {
            host.kubeconfig = false;
            return Ok(String::new());
        }
        if let Some(path) = cmd.strip_prefix("rm -f ") {
            host.files.remove(path);
            return Ok(String::new());
        }
        if cmd.starts_with("if ip link show ") {
            for link in ["cni0", "flannel.1"] {
                if cmd.contains(&format!("ip link delete {}", link)) {
                    host.links.remove(link);
                }
            }
            return Ok(String::new());
        }
        if cmd.starts_with("rm -rf /var/lib/cni/") {
            host.cni_state = false;
            return Ok(String::new());
        }
        if cmd == "systemctl stop kubelet" {
            host.kubelet_running = false;
            return Ok(String::new());
        }
        if cmd.starts_with("kubeadm init") {
            if host.initialized {
                return Err(exit(1, "[ERROR Port-6443]: Port 6443 is in use"));
            }
            let advertise = cmd
                .split_whitespace()
                .find_map(|arg| arg.strip_prefix("--apiserver-advertise-address="))
                .unwrap_or(ip)
                .to_string();
            host.initialized = true;
            host.kubelet_running = true;
            return Ok(init_output(&advertise));
        }
        if let Some(path) = cmd.strip_prefix("kubectl apply -f ") {
            if !host.files.contains(path) {
                return Err(exit(1, &format!("error: the path \"{}\" does not exist", path)));
            }
            host.links.insert("cni0".to_string());
            host.links.insert("flannel.1".to_string());
            host.cni_state = true;
            return Ok("daemonset.apps/kube-flannel-ds created".to_string());
        }
        if cmd == CREDENTIALS_COMMAND {
            if !host.initialized {
                return Err(exit(1, "cp: cannot stat '/etc/kubernetes/admin.conf'"));
            }
            host.kubeconfig = true;
            return Ok(kubeconfig(ip));
        }
        if cmd == TOKEN_CREATE_COMMAND {
            if !host.initialized {
                return Ok("failed to load admin kubeconfig".to_string());
            }
            return Ok(format!(
                "kubeadm join {}:6443 --token fresh.0123456789abcdef --discovery-token-ca-cert-hash sha256:abc \n",
                ip
            ));
        }
        if cmd.starts_with("kubeadm join ") {
            if host.joined || host.initialized {
                return Err(exit(1, "[ERROR FileAvailable--etc-kubernetes-kubelet.conf]"));
            }
            host.joined = true;
            host.kubelet_running = true;
            host.links.insert("flannel.1".to_string());
            return Ok("This node has joined the cluster".to_string());
        }
        if cmd.starts_with("kubectl label nodes ") || cmd.starts_with("kubectl get nodes ") {
            return Ok(String::new());
        }

        Err(TransportError::Other(format!("fake host can't run: {}", cmd)))
    }
}

#[async_trait]
impl RemoteExecutor for FakeFleet {
    async fn run(&self, machine: &Machine, command: &str) -> Result<ConsoleOutput, TransportError> {
        self.log
            .lock()
            .unwrap()
            .push((machine.ip.clone(), command.to_string()));
        if self.unreachable.lock().unwrap().contains(&machine.ip) {
            return Err(TransportError::Connect(format!("ssh: connect to host {} port 22: No route to host", machine.ip)));
        }
        self.execute(&machine.ip, command).map(ConsoleOutput::from)
    }

    async fn write_artifact(&self, machine: &Machine, path: &str, _contents: &str) -> Result<(), TransportError> {
        if self.unreachable.lock().unwrap().contains(&machine.ip) {
            return Err(TransportError::Connect("no route to host".to_string()));
        }
        self.hosts
            .lock()
            .unwrap()
            .entry(machine.ip.clone())
            .or_default()
            .files
            .insert(path.to_string());
        Ok(())
    }
}

/// What `kubeadm init` prints for an advertise address
pub fn init_output(ip: &str) -> String {
    format!(
        "Your Kubernetes control-plane has initialized successfully!\n\
\n\
You can now join any number of the control-plane node running the following command on each as root:\n\
\n\
  kubeadm join {ip}:6443 --token abcdef.0123456789abcdef \\\n\
\t--discovery-token-ca-cert-hash sha256:0123 \\\n\
\t--control-plane --certificate-key 4567\n\
\n\
Then you can join any number of worker nodes by running the following on each as root:\n\
\n\
kubeadm join {ip}:6443 --token abcdef.0123456789abcdef \\\n\
\t--discovery-token-ca-cert-hash sha256:0123 \n"
    )
}

/// Admin kubeconfig for a master
pub fn kubeconfig(ip: &str) -> String {
    format!(
        "apiVersion: v1\nclusters:\n- cluster:\n    server: https://{ip}:6443\n  name: kubernetes\n\
users:\n- name: kubernetes-admin\n  user:\n    client-certificate-data: LS0tLS1CRUdJTg==\n"
    )
}
